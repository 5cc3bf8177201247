//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api` and serves the static
//! browser UI as the fallback. The UI is a single page talking to the API
//! with fetch; there is no server-side rendering.

pub mod auth;
pub mod images;
pub mod objects;

use std::path::PathBuf;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

// Multipart framing overhead on top of the file itself.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes + BODY_LIMIT_SLACK);

    Router::new()
        .route("/api/auth/email/request-code", post(auth::request_email_code))
        .route("/api/auth/email/verify-code", post(auth::verify_email_code))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/images", get(images::list_images).post(images::upload_image))
        .route("/api/images/process", post(images::process_image))
        .route("/api/images/{id}", get(images::get_image).delete(images::delete_image))
        .route("/api/objects/{*key}", get(objects::get_object))
        .route("/healthz", get(healthz))
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

/// Resolve the path to the static UI directory.
fn website_dir() -> PathBuf {
    std::env::var("WEBSITE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("website"))
}

/// Full application: API routes plus the static UI shell at `/`.
pub fn app(state: AppState) -> Router {
    let website = ServeDir::new(website_dir()).append_index_html_on_directories(true);

    api_routes(state)
        .fallback_service(website)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
