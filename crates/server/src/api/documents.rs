//! Document upload, extraction progress and signed download URLs.

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use examly_core::ExtractionStatus;
use examly_study::UploadedFile;

use super::{bad_request, study_error, ApiResult, Caller, ErrorResponse};
use crate::state::AppState;

// ── Request/Response types ────────────────────────

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub original_name: String,
    pub file_type: String,
    pub file_size: u64,
    /// Whether text was extracted at upload time.
    pub extracted: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub message: &'static str,
    pub documents: Vec<UploadedDocument>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct StatusQuery {
    /// Comma-separated document ids.
    pub ids: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    #[schema(value_type = Vec<Object>)]
    pub documents: Vec<ExtractionStatus>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct UrlQuery {
    /// Blob path as stored on the document.
    pub path: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UrlResponse {
    pub url: String,
}

// ── POST /api/upload ──────────────────────────────

/// Upload study documents
///
/// Accepts multipart/form-data with one or more file fields. Every file is
/// stored under the caller's prefix and its text extracted right away.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Documents",
    request_body(content_type = "multipart/form-data", description = "One or more files"),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "No files or unsupported type", body = ErrorResponse),
        (status = 413, description = "Too many or too large files", body = ErrorResponse)
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let limits = state.uploads;
    let too_large = |msg: String| {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ErrorResponse { error: msg, kind: "input" }),
        )
    };

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {e}")))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if files.len() == limits.max_files {
            return Err(too_large(format!("At most {} files per upload", limits.max_files)));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Failed to read file: {e}")))?;
        if bytes.len() > limits.max_file_bytes {
            return Err(too_large(format!(
                "'{name}' exceeds the {} MB limit",
                limits.max_file_bytes / (1024 * 1024)
            )));
        }
        files.push(UploadedFile { name, bytes });
    }

    let documents = state.library.upload(user, files).await.map_err(study_error)?;
    info!(user = %user, documents = documents.len(), "upload complete");

    Ok(Json(UploadResponse {
        message: "Files uploaded successfully",
        documents: documents
            .into_iter()
            .map(|d| UploadedDocument {
                extracted: d.usable_text().is_some(),
                id: d.id,
                original_name: d.original_name,
                file_type: d.file_type,
                file_size: d.file_size,
            })
            .collect(),
    }))
}

// ── GET /api/documents/status ─────────────────────

/// Extraction progress for the caller's documents
#[utoipa::path(
    get,
    path = "/api/documents/status",
    tag = "Documents",
    params(StatusQuery),
    responses(
        (status = 200, description = "Per-document status", body = StatusResponse),
        (status = 400, description = "Missing or invalid ids", body = ErrorResponse)
    )
)]
pub async fn status(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<StatusResponse>> {
    let ids = query
        .ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Uuid::parse_str)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| bad_request(format!("Invalid document id: {e}")))?;
    if ids.is_empty() {
        return Err(bad_request("Document IDs are required"));
    }

    let documents = state
        .library
        .extraction_status(user, &ids)
        .await
        .map_err(study_error)?;
    Ok(Json(StatusResponse { documents }))
}

// ── GET /api/documents/url ────────────────────────

/// Time-limited URL for one of the caller's files
#[utoipa::path(
    get,
    path = "/api/documents/url",
    tag = "Documents",
    params(UrlQuery),
    responses(
        (status = 200, description = "Signed URL", body = UrlResponse),
        (status = 403, description = "Path belongs to another user", body = ErrorResponse)
    )
)]
pub async fn url(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<UrlResponse>> {
    if query.path.trim().is_empty() {
        return Err(bad_request("File path is required"));
    }
    let url = state
        .library
        .document_url(user, query.path.trim(), state.signed_url_ttl)
        .await
        .map_err(study_error)?;
    Ok(Json(UrlResponse { url }))
}
