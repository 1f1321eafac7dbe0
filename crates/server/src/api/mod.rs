//! Domain-focused API endpoint modules.
//!
//! Shared error envelope, `StudyError` → status mapping and the caller
//! identity extractor live here.

pub mod doc;
pub mod documents;
pub mod health;
pub mod materials;
pub mod notifications;
pub mod process;
pub mod users;
pub mod youtube;

#[cfg(test)]
mod tests;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use examly_core::UserId;
use examly_study::{ErrorKind, StudyError};

/// Header carrying the user id resolved by the identity provider.
pub const USER_ID_HEADER: &str = "x-user-id";

// ── Shared types ─────────────────────────────────────────────────

#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// `input`, `configuration`, `transient`, `access` or `internal`.
    pub kind: &'static str,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self { message: message.into() })
    }
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<T, ApiError>;

// ── Helpers ──────────────────────────────────────────────────────

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Input => "input",
        ErrorKind::Configuration => "configuration",
        ErrorKind::Transient => "transient",
        ErrorKind::Access => "access",
        ErrorKind::Internal => "internal",
    }
}

pub(crate) fn status_for(e: &StudyError) -> StatusCode {
    match e {
        StudyError::NotFound(_) => StatusCode::NOT_FOUND,
        StudyError::Unauthorized(_) => StatusCode::FORBIDDEN,
        StudyError::EmptyExtraction => StatusCode::UNPROCESSABLE_ENTITY,
        StudyError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        StudyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        other => match other.kind() {
            ErrorKind::Input => StatusCode::BAD_REQUEST,
            ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Access => StatusCode::FORBIDDEN,
            ErrorKind::Configuration | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

pub(crate) fn study_error(e: StudyError) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        error!(status = status.as_u16(), "{}", e);
    } else {
        warn!(status = status.as_u16(), "{}", e);
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            kind: kind_label(e.kind()),
        }),
    )
}

pub(crate) fn bad_request(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.into(),
            kind: "input",
        }),
    )
}

// ── Identity ─────────────────────────────────────────────────────

/// The authenticated caller, as resolved upstream.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(Caller)
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Unauthorized".into(),
                    kind: "access",
                }),
            ))
    }
}
