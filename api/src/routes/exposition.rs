//! Scrape endpoint.
//!
//! Serves every registered series, the prefix failure counter and the
//! request counter in the Prometheus text format.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};

/// Creates the exposition routes.
pub fn exposition_routes(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

async fn render_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.registry().render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
