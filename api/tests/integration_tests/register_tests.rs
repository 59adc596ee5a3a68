//! Integration tests for `POST /register`.
//!
//! Tests cover:
//! - Successful registration with and without a staleness watch
//! - Duplicate registration
//! - Validation and type errors
//! - Rollback when the watch cannot be created
//! - Unsupported methods and malformed bodies

use axum::http::StatusCode;
use serde_json::json;

use super::common::{post_json, post_raw, registration, request, test_app};

#[tokio::test]
async fn test_register_metric_with_labels() {
    let (app, state) = test_app();

    let body = json!({
        "metrics_name": "my_metric",
        "prefix": "prefix_foo",
        "type": "counter",
        "labels": [{"key1": "value1"}, {"key2": "value2"}],
        "help": "This is a test metric"
    });

    let (status, response) = post_json(app, "/register", body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.is_empty());
    assert!(state.registry().has_metric("prefix_foo", "my_metric"));
}

#[tokio::test]
async fn test_register_twice_is_rejected() {
    let (app, state) = test_app();

    let (status, _) = post_json(app.clone(), "/register", registration("batch", "jobs", "counter")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, response) = post_json(app, "/register", registration("batch", "jobs", "gauge")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, "metric batch_jobs already registered");
    assert_eq!(state.registry().metric_count(), 1);
}

#[tokio::test]
async fn test_same_name_under_different_prefixes() {
    let (app, state) = test_app();

    let (status, _) = post_json(app.clone(), "/register", registration("east", "jobs", "counter")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(app, "/register", registration("west", "jobs", "counter")).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(state.registry().metric_count(), 2);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let (app, state) = test_app();

    let (status, response) = post_json(app.clone(), "/register", registration("batch", "", "counter")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("name field cannot be empty"));

    let (status, _) = post_json(app, "/register", registration("", "jobs", "counter")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(state.registry().metric_count(), 0);
}

#[tokio::test]
async fn test_register_invalid_type() {
    let (app, _state) = test_app();

    let (status, response) = post_json(app, "/register", registration("batch", "jobs", "summary")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, "unknown metric type: summary");
}

#[tokio::test]
async fn test_register_with_check_schedule() {
    let (app, state) = test_app();

    let mut body = registration("batch", "jobs", "counter");
    body["check_schedule"] = json!("@every 1m");

    let (status, _) = post_json(app.clone(), "/register", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.registry().watched_prefixes(), vec!["batch".to_string()]);
    assert_eq!(state.registry().scheduler().len(), 1);

    // A second series under the same prefix keeps the single watch.
    let mut body = registration("batch", "errors", "counter");
    body["check_schedule"] = json!("@every 1m");
    let (status, _) = post_json(app, "/register", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.registry().scheduler().len(), 1);
}

#[tokio::test]
async fn test_register_invalid_schedule_leaves_nothing_behind() {
    let (app, state) = test_app();

    let mut body = registration("batch", "jobs", "counter");
    body["check_schedule"] = json!("every so often");

    let (status, response) = post_json(app.clone(), "/register", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("every so often"));
    assert!(!state.registry().has_metric("batch", "jobs"));
    assert!(state.registry().watched_prefixes().is_empty());

    // The identity is free again.
    let (status, _) = post_json(app, "/register", registration("batch", "jobs", "counter")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_wrong_method() {
    let (app, _state) = test_app();

    for method in ["GET", "PUT", "DELETE"] {
        let (status, response) = request(app.clone(), method, "/register").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response, "Method not allowed");
    }
}

#[tokio::test]
async fn test_register_malformed_body() {
    let (app, state) = test_app();

    let (status, _) = post_raw(app, "/register", r#"{"metrics_name": "jobs", "prefix": "#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.registry().metric_count(), 0);
}
