//! API route definitions.
//!
//! This module organizes all HTTP routes for the Pushwatch API server.

mod exposition;
mod health;
mod register;
mod store;

pub use exposition::exposition_routes;
pub use health::health_routes;
pub use register::register_routes;
pub use store::store_routes;

use axum::http::StatusCode;

/// Fallback for unsupported methods on the write endpoints.
async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
