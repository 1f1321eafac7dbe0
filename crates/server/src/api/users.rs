use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use examly_core::User;
use examly_study::library::UserSuggestion;

use super::{study_error, ApiResult, Caller, ErrorResponse};
use crate::state::AppState;

#[derive(Deserialize, utoipa::IntoParams)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SuggestionsResponse {
    #[schema(value_type = Vec<Object>)]
    pub suggestions: Vec<UserSuggestion>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ProfileRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    #[schema(value_type = Object)]
    pub user: User,
}

/// Email autocompletion for sharing
#[utoipa::path(
    get,
    path = "/api/users/suggestions",
    tag = "Users",
    params(SuggestionQuery),
    responses((status = 200, description = "Up to 10 matching users", body = SuggestionsResponse))
)]
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Query(q): Query<SuggestionQuery>,
) -> ApiResult<Json<SuggestionsResponse>> {
    let suggestions = state
        .library
        .suggest_users(user, &q.query)
        .await
        .map_err(study_error)?;
    Ok(Json(SuggestionsResponse { suggestions }))
}

/// Register the caller's profile as reported by the identity provider
#[utoipa::path(
    put,
    path = "/api/users/me",
    tag = "Users",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Stored profile", body = ProfileResponse),
        (status = 400, description = "Invalid or taken email", body = ErrorResponse)
    )
)]
pub async fn sync_profile(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state
        .library
        .sync_profile(user, &req.email, req.name)
        .await
        .map_err(study_error)?;
    Ok(Json(ProfileResponse { user }))
}
