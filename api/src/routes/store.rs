//! Value ingestion endpoint.

use super::method_not_allowed;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use shared::models::{MetricUpdate, StoreRequest};
use shared::validator::Validate;
use shared::RegistryError;

/// Creates the store routes.
pub fn store_routes(state: AppState) -> Router {
    Router::new()
        .route("/store", post(store_metric).fallback(method_not_allowed))
        .with_state(state)
}

/// Adds to a counter or sets a gauge, and marks the prefix as updated.
async fn store_metric(
    State(state): State<AppState>,
    payload: Result<Json<StoreRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    request.validate().map_err(RegistryError::from)?;
    state.registry().store_metric(&MetricUpdate::from(request))?;
    Ok(StatusCode::OK)
}
