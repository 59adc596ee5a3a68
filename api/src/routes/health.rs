//! Health check endpoint.
//!
//! Provides a simple health check endpoint for load balancers and monitoring systems.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Number of registered series.
    pub metrics: usize,
    /// Number of prefixes under staleness watch.
    pub watched_prefixes: usize,
    /// Whether scheduled audits are running.
    pub scheduler_running: bool,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check handler.
///
/// Returns a simple JSON response indicating the service is healthy.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.registry();
    Json(HealthResponse {
        status: "healthy",
        service: "pushwatch-api",
        version: env!("CARGO_PKG_VERSION"),
        metrics: registry.metric_count(),
        watched_prefixes: registry.watched_prefixes().len(),
        scheduler_running: registry.scheduler().is_running(),
    })
}
