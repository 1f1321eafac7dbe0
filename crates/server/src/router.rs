//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// `*` allows any origin; anything else must be a single valid origin.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin.trim() == "*" {
        return CorsLayer::permissive();
    }
    match origin.trim().parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!("Invalid CORS_ORIGIN '{}'; allowing any origin", origin);
            CorsLayer::permissive()
        }
    }
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    let upload_limit = state.uploads.body_limit();

    Router::new()
        .route("/health", get(api::health::health))
        .route("/api/config", get(api::health::config))
        // Documents
        .route(
            "/api/upload",
            post(api::documents::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/documents/status", get(api::documents::status))
        .route("/api/documents/url", get(api::documents::url))
        // Materials
        .route("/api/process", post(api::process::process))
        .route("/api/materials", get(api::materials::list))
        .route(
            "/api/materials/{id}",
            put(api::materials::update).delete(api::materials::delete),
        )
        .route("/api/materials/{id}/documents", get(api::materials::documents))
        .route("/api/materials/{id}/share", post(api::materials::share))
        .route("/api/materials/{id}/vote", post(api::materials::vote))
        // Notifications
        .route("/api/notifications", get(api::notifications::list))
        .route("/api/notifications/{id}/read", put(api::notifications::mark_read))
        // Users: /me MUST precede any future /{id} route
        .route("/api/users/me", put(api::users::sync_profile))
        .route("/api/users/suggestions", get(api::users::suggestions))
        // Videos
        .route("/api/youtube/search", get(api::youtube::search))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}
