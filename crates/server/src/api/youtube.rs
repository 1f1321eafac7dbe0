use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use examly_study::VideoResult;

use super::{bad_request, ApiResult, Caller, ErrorResponse};
use crate::state::AppState;

const MAX_RESULTS_CAP: usize = 25;

#[derive(Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Search terms.
    #[serde(default)]
    pub q: String,
    /// Defaults to `YOUTUBE_MAX_RESULTS`.
    pub max: Option<usize>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    #[schema(value_type = Vec<Object>)]
    pub videos: Vec<VideoResult>,
}

/// Search YouTube for study videos
///
/// Failures upstream yield an empty list rather than an error.
#[utoipa::path(
    get,
    path = "/api/youtube/search",
    tag = "Videos",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching videos", body = SearchResponse),
        (status = 400, description = "Missing query", body = ErrorResponse)
    )
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Caller(_user): Caller,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    if query.q.trim().is_empty() {
        return Err(bad_request("searchQuery is required"));
    }
    let max = query
        .max
        .unwrap_or_else(|| state.videos.default_max())
        .min(MAX_RESULTS_CAP);
    let videos = state.videos.search(&query.q, max).await;
    Ok(Json(SearchResponse { videos }))
}
