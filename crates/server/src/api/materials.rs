//! Material listing, editing, sharing and voting.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use examly_core::{MaterialId, VoteKind, VoteTally};
use examly_study::library::{ChapterDocument, ShareCounts};
use examly_study::MaterialView;

use super::{bad_request, study_error, ApiResult, Caller, ErrorResponse, MessageResponse};
use crate::state::AppState;

// ── Request/Response types ────────────────────────

#[derive(Serialize, utoipa::ToSchema)]
pub struct MaterialListResponse {
    #[schema(value_type = Vec<Object>)]
    pub materials: Vec<MaterialView>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentsResponse {
    #[schema(value_type = Vec<Object>)]
    pub documents: Vec<ChapterDocument>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateRequest {
    pub title: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TitleView {
    #[schema(value_type = String)]
    pub id: MaterialId,
    pub title: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UpdateResponse {
    pub message: &'static str,
    pub material: TitleView,
}

/// `{"email": "a@b"}` or `{"emails": ["a@b", "c@d"]}`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ShareRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
}

impl ShareRequest {
    fn addresses(self) -> Vec<String> {
        self.email
            .into_iter()
            .chain(self.emails)
            .filter(|e| !e.trim().is_empty())
            .collect()
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ShareResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub results: ShareCounts,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct VoteRequest {
    /// `up` or `down`.
    pub vote: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VoteResponse {
    pub message: &'static str,
    #[schema(value_type = Object)]
    pub votes: VoteTally,
}

// ── Handlers ──────────────────────────────────────

/// Materials owned by or shared with the caller, newest first
#[utoipa::path(
    get,
    path = "/api/materials",
    tag = "Materials",
    responses((status = 200, description = "Material list", body = MaterialListResponse))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> ApiResult<Json<MaterialListResponse>> {
    let materials = state.library.list(user).await.map_err(study_error)?;
    Ok(Json(MaterialListResponse { materials }))
}

/// A material's documents in chapter order, with full text
#[utoipa::path(
    get,
    path = "/api/materials/{id}/documents",
    tag = "Materials",
    params(("id" = String, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Documents", body = DocumentsResponse),
        (status = 404, description = "Not found or not readable", body = ErrorResponse)
    )
)]
pub async fn documents(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DocumentsResponse>> {
    let documents = state.library.documents(user, id).await.map_err(study_error)?;
    Ok(Json(DocumentsResponse { documents }))
}

/// Rename a material (owner only)
#[utoipa::path(
    put,
    path = "/api/materials/{id}",
    tag = "Materials",
    params(("id" = String, Path, description = "Material ID")),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Renamed", body = UpdateResponse),
        (status = 400, description = "Empty title", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRequest>,
) -> ApiResult<Json<UpdateResponse>> {
    let material = state.library.rename(user, id, &req.title).await.map_err(study_error)?;
    Ok(Json(UpdateResponse {
        message: "Material title updated successfully",
        material: TitleView {
            id: material.id,
            title: material.title,
        },
    }))
}

/// Delete a material and its documents (owner only)
#[utoipa::path(
    delete,
    path = "/api/materials/{id}",
    tag = "Materials",
    params(("id" = String, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.library.delete(user, id).await.map_err(study_error)?;
    Ok(MessageResponse::new("Material deleted successfully"))
}

/// Share a material with other users by email (owner only)
#[utoipa::path(
    post,
    path = "/api/materials/{id}/share",
    tag = "Materials",
    params(("id" = String, Path, description = "Material ID")),
    request_body = ShareRequest,
    responses(
        (status = 200, description = "Per-address outcome counts", body = ShareResponse),
        (status = 400, description = "No addresses", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse)
    )
)]
pub async fn share(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<ShareRequest>,
) -> ApiResult<Json<ShareResponse>> {
    let report = state
        .library
        .share(user, id, &req.addresses())
        .await
        .map_err(study_error)?;
    Ok(Json(ShareResponse {
        message: report.message,
        results: report.results,
    }))
}

/// Vote a material up or down; replaces the caller's earlier vote
#[utoipa::path(
    post,
    path = "/api/materials/{id}/vote",
    tag = "Materials",
    params(("id" = String, Path, description = "Material ID")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Updated tally", body = VoteResponse),
        (status = 400, description = "Invalid vote", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn vote(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    let kind: VoteKind = req
        .vote
        .parse()
        .map_err(|_| bad_request("Vote must be 'up' or 'down'"))?;
    let votes = state.library.vote(user, id, kind).await.map_err(study_error)?;
    Ok(Json(VoteResponse {
        message: "Vote recorded",
        votes,
    }))
}
