//! Health and configuration endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ai_ready: bool,
    pub llm_provider: Option<String>,
}

/// Server liveness and AI availability
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ai_ready: state.pipeline.is_some(),
        llm_provider: state.llm_provider.clone(),
    })
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConfigResponse {
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
}

/// Active configuration with secrets removed
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "Health",
    responses((status = 200, description = "Redacted configuration", body = ConfigResponse))
)]
pub async fn config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        config: state.config_summary.clone(),
    })
}
