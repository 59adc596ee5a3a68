//! Integration tests for health check and general API functionality.
//!
//! Tests cover:
//! - Health check endpoint
//! - Unknown routes

use axum::http::StatusCode;

use super::common::{get, get_json, post_json, registration, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = test_app();

    let (status, response) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "pushwatch-api");
    assert_eq!(response["metrics"], 0);
}

#[tokio::test]
async fn test_health_reports_registered_series() {
    let (app, _state) = test_app();

    let (status, _) = post_json(app.clone(), "/register", registration("batch", "a", "counter")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(app.clone(), "/register", registration("batch", "b", "gauge")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, response) = get_json(app, "/health").await;
    assert_eq!(response["metrics"], 2);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _state) = test_app();

    let (status, _) = get(app, "/api/v1/logs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
