//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All endpoints are mounted under `/api/v1`; `/health` stays at the root.
//! With the `swagger-ui` feature the OpenAPI document is served at
//! `/api-docs/openapi.json` and browsable under `/swagger-ui`.

pub mod dto;
pub mod extract;
pub mod form;
pub mod handlers;
pub mod openapi;

use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());
    with_docs(router)
}

/// Room for the text fields and multipart framing of an upload form.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Most files a single form carries (coupon photo and carousel photo).
const MAX_FILES_PER_FORM: usize = 2;

/// Request body limit for forms whose files are each at most
/// `max_upload_bytes`.
#[must_use]
pub const fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(MAX_FILES_PER_FORM)
        .saturating_add(FORM_OVERHEAD_BYTES)
}

/// Builds the served application: API routes, uploaded media under
/// `/media`, and the tracing, CORS, timeout and body size layers.
pub fn build_app(
    state: AppState,
    media_dir: &Path,
    request_timeout: Duration,
    max_upload_bytes: usize,
) -> Router {
    build_router()
        .layer(DefaultBodyLimit::max(body_limit(max_upload_bytes)))
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(feature = "swagger-ui")]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    router.merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router
}
