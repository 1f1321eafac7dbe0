use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use examly_study::library::NotificationView;

use super::{study_error, ApiResult, Caller, ErrorResponse, MessageResponse};
use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct NotificationsResponse {
    #[schema(value_type = Vec<Object>)]
    pub notifications: Vec<NotificationView>,
}

/// The caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    responses((status = 200, description = "Notifications", body = NotificationsResponse))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> ApiResult<Json<NotificationsResponse>> {
    let notifications = state.library.notifications(user).await.map_err(study_error)?;
    Ok(Json(NotificationsResponse { notifications }))
}

/// Mark one of the caller's notifications as read
#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.library.mark_read(user, id).await.map_err(study_error)?;
    Ok(MessageResponse::new("Notification marked as read"))
}
