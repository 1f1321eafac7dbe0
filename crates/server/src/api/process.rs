//! `POST /api/process`: documents in, study material out.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use examly_core::Material;
use examly_study::{IngestionRequest, StudyError};

use super::{study_error, ApiResult, Caller};
use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub message: &'static str,
    #[schema(value_type = Object)]
    pub study_material: Material,
}

/// Generate a study material from uploaded documents
///
/// Runs extraction, chapter sequencing, overall and per-chapter synthesis,
/// then persists the result. Nothing is stored if the run fails.
#[utoipa::path(
    post,
    path = "/api/process",
    tag = "Materials",
    request_body(content = Object, description = "documentIds, features, title?, outputLanguage?"),
    responses(
        (status = 200, description = "Material created", body = ProcessResponse),
        (status = 400, description = "Bad input", body = super::ErrorResponse),
        (status = 404, description = "Documents not found", body = super::ErrorResponse),
        (status = 429, description = "AI rate limit", body = super::ErrorResponse),
        (status = 500, description = "AI not configured", body = super::ErrorResponse),
        (status = 503, description = "AI failure", body = super::ErrorResponse),
        (status = 504, description = "Run timed out", body = super::ErrorResponse)
    )
)]
pub async fn process(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Json(request): Json<IngestionRequest>,
) -> ApiResult<Json<ProcessResponse>> {
    let pipeline = state.pipeline.as_ref().ok_or_else(|| {
        study_error(StudyError::ConfigurationError(
            state.llm_unavailable.clone().unwrap_or_else(|| "no provider".into()),
        ))
    })?;

    let material = pipeline.run(user, request).await.map_err(study_error)?;
    Ok(Json(ProcessResponse {
        message: "Study material processed successfully",
        study_material: material,
    }))
}
