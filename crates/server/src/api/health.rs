//! Server and analyzer-grid readiness.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct GridHealth {
    /// "healthy", "degraded", or "unhealthy: <reason>".
    pub status: String,
    pub ready: bool,
    pub nodes: usize,
    pub max_sessions: usize,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub api: &'static str,
    pub analyzer_grid: GridHealth,
}

/// Health check. The API itself is healthy if it can answer; the analyzer
/// grid's readiness is probed live so operators see both at a glance.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "API and analyzer grid status", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let analyzer_grid = match state.grid.status().await {
        Ok(grid) => GridHealth {
            status: if grid.ready { "healthy" } else { "degraded" }.to_string(),
            ready: grid.ready,
            nodes: grid.nodes,
            max_sessions: grid.nodes * 4,
        },
        Err(e) => GridHealth {
            status: format!("unhealthy: {}", e),
            ready: false,
            nodes: 0,
            max_sessions: 0,
        },
    };

    Json(HealthResponse {
        api: "healthy",
        analyzer_grid,
    })
}
