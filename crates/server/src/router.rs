//! HTTP router construction.
//!
//! Assembles routes, the static artifact mount, middleware, and OpenAPI
//! docs into a single `Router`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::doc::ApiDoc;
use crate::state::AppState;

/// Build the complete application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.static_dir.clone();
    Router::new()
        .route("/health", get(api::health))
        // Submission aliases, kept for older clients.
        .route("/analyze-batch", post(api::analyze_batch))
        .route("/analyze-traffic", post(api::analyze_batch))
        .route("/analyze-locations", post(api::analyze_batch))
        .route("/analyze-points", post(api::analyze_batch))
        .route("/job/{job_id}", get(api::get_job))
        .route("/job/{job_id}/cancel", post(api::cancel_job))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
}
