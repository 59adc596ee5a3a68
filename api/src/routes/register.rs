//! Metric registration endpoint.
//!
//! `POST /register` creates a series and, when the request carries a
//! `check_schedule`, a staleness watch for its prefix. Both are created or
//! neither is.

use super::method_not_allowed;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use shared::models::{MetricDefinition, RegistrationRequest};

/// Creates the registration routes.
pub fn register_routes(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register_metric).fallback(method_not_allowed))
        .with_state(state)
}

async fn register_metric(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    let check_schedule = request.check_schedule.clone().filter(|s| !s.is_empty());

    let definition = MetricDefinition::try_from(request)?;
    let (prefix, name) = (definition.prefix.clone(), definition.name.clone());
    let registry = state.registry();
    registry.register_metric(definition)?;

    if let Some(schedule) = check_schedule {
        if let Err(e) = registry.register_prefix_watch(&prefix, &schedule) {
            tracing::warn!(%prefix, %name, error = %e, "Prefix watch failed, rolling back metric");
            if let Err(rollback) = registry.unregister_metric(&prefix, &name) {
                tracing::error!(%prefix, %name, error = %rollback, "Rollback failed");
            }
            return Err(e.into());
        }
    }

    Ok(StatusCode::OK)
}
