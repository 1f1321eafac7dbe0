//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 spec, served via Scalar UI at `/docs`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::USER_ID_HEADER;

struct CallerHeader;

impl Modify for CallerHeader {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_ID_HEADER))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Examly API",
        version = "0.1.0",
        description = "Study-material generation from uploaded documents, with sharing and voting.",
    ),
    modifiers(&CallerHeader),
    security(("user_id" = [])),
    tags(
        (name = "Health", description = "Server liveness and configuration"),
        (name = "Documents", description = "Upload, extraction progress, signed URLs"),
        (name = "Materials", description = "Generation, listing, editing, sharing, voting"),
        (name = "Notifications", description = "Share notifications"),
        (name = "Users", description = "Profiles and share autocompletion"),
        (name = "Videos", description = "YouTube search"),
    ),
    paths(
        // Health
        crate::api::health::health,
        crate::api::health::config,
        // Documents
        crate::api::documents::upload,
        crate::api::documents::status,
        crate::api::documents::url,
        // Materials
        crate::api::process::process,
        crate::api::materials::list,
        crate::api::materials::documents,
        crate::api::materials::update,
        crate::api::materials::delete,
        crate::api::materials::share,
        crate::api::materials::vote,
        // Notifications
        crate::api::notifications::list,
        crate::api::notifications::mark_read,
        // Users
        crate::api::users::suggestions,
        crate::api::users::sync_profile,
        // Videos
        crate::api::youtube::search,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::MessageResponse,
        crate::api::health::HealthResponse,
        crate::api::health::ConfigResponse,
        crate::api::documents::UploadResponse,
        crate::api::documents::UploadedDocument,
        crate::api::documents::StatusResponse,
        crate::api::documents::UrlResponse,
        crate::api::process::ProcessResponse,
        crate::api::materials::MaterialListResponse,
        crate::api::materials::DocumentsResponse,
        crate::api::materials::UpdateRequest,
        crate::api::materials::UpdateResponse,
        crate::api::materials::TitleView,
        crate::api::materials::ShareRequest,
        crate::api::materials::ShareResponse,
        crate::api::materials::VoteRequest,
        crate::api::materials::VoteResponse,
        crate::api::notifications::NotificationsResponse,
        crate::api::users::SuggestionsResponse,
        crate::api::users::ProfileRequest,
        crate::api::users::ProfileResponse,
        crate::api::youtube::SearchResponse,
    ))
)]
pub struct ApiDoc;
