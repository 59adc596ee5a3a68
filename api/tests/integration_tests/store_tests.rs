//! Integration tests for `POST /store`.
//!
//! Tests cover:
//! - Counter accumulation and gauge replacement
//! - Labelled series
//! - Unregistered series, label mismatches and invalid values

use axum::http::StatusCode;
use serde_json::json;

use super::common::{post_json, post_raw, registration, request, store, test_app};

#[tokio::test]
async fn test_store_counter_is_additive() {
    let (app, state) = test_app();
    post_json(app.clone(), "/register", registration("p", "n", "counter")).await;

    let (status, response) = post_json(app.clone(), "/store", store("p", "n", 3.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.is_empty());
    let (status, _) = post_json(app, "/store", store("p", "n", 4.0)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(state.registry().current_value("p", "n", &[]), Some(7.0));
}

#[tokio::test]
async fn test_store_gauge_replaces() {
    let (app, state) = test_app();
    post_json(app.clone(), "/register", registration("p", "depth", "gauge")).await;

    post_json(app.clone(), "/store", store("p", "depth", 10.0)).await;
    post_json(app.clone(), "/store", store("p", "depth", -2.5)).await;

    assert_eq!(state.registry().current_value("p", "depth", &[]), Some(-2.5));
}

#[tokio::test]
async fn test_store_with_labels_in_any_order() {
    let (app, state) = test_app();
    let register = json!({
        "metrics_name": "requests",
        "prefix": "web",
        "type": "counter",
        "labels": [{"region": ""}, {"host": ""}]
    });
    let (status, _) = post_json(app.clone(), "/register", register).await;
    assert_eq!(status, StatusCode::OK);

    let body = json!({
        "metrics_name": "requests",
        "prefix": "web",
        "labels": [{"host": "h1"}, {"region": "eu"}],
        "value": 5
    });
    let (status, _) = post_json(app, "/store", body).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        state
            .registry()
            .current_value("web", "requests", &[("region", "eu"), ("host", "h1")]),
        Some(5.0)
    );
}

#[tokio::test]
async fn test_store_unregistered_metric() {
    let (app, state) = test_app();

    let (status, response) = post_json(app, "/store", store("p", "missing", 1.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, "metric p_missing not registered");
    assert_eq!(state.registry().metric_count(), 0);
}

#[tokio::test]
async fn test_store_label_mismatch() {
    let (app, _state) = test_app();
    let register = json!({
        "metrics_name": "requests",
        "prefix": "web",
        "type": "counter",
        "labels": [{"region": ""}]
    });
    post_json(app.clone(), "/register", register).await;

    let body = json!({
        "metrics_name": "requests",
        "prefix": "web",
        "labels": [{"zone": "a"}],
        "value": 1
    });
    let (status, response) = post_json(app, "/store", body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.contains("region"));
}

#[tokio::test]
async fn test_store_negative_counter_increment() {
    let (app, state) = test_app();
    post_json(app.clone(), "/register", registration("p", "n", "counter")).await;

    let (status, _) = post_json(app, "/store", store("p", "n", -1.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.registry().current_value("p", "n", &[]), None);
}

#[tokio::test]
async fn test_store_wrong_method_and_bad_body() {
    let (app, _state) = test_app();

    let (status, response) = request(app.clone(), "GET", "/store").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response, "Method not allowed");

    let (status, _) = post_raw(app, "/store", r#"{"metrics_name": 12}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
