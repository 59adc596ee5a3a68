//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup and HTTP request helpers.

use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};

/// Creates a test router around a fresh registry whose scheduler is stopped.
///
/// # Returns
///
/// A tuple containing the configured router and the app state.
pub fn test_app() -> (Router, AppState) {
    let state = AppState::with_new_registry().unwrap();
    let router = create_router(state.clone());
    (router, state)
}

/// Registration body for a series without labels.
pub fn registration(prefix: &str, name: &str, kind: &str) -> Value {
    json!({
        "metrics_name": name,
        "prefix": prefix,
        "type": kind,
        "labels": []
    })
}

/// Store body for a series without labels.
pub fn store(prefix: &str, name: &str, value: f64) -> Value {
    json!({
        "metrics_name": name,
        "prefix": prefix,
        "labels": [],
        "value": value
    })
}

/// Helper to make a POST request with JSON body.
///
/// # Returns
///
/// A tuple containing the response status code and the response body as text.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, String) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
    )
    .await
}

/// Helper to make a POST request with a raw, possibly malformed, JSON body.
pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> (StatusCode, String) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
}

/// Helper to make a request without a body.
pub async fn request(app: Router, method: &str, uri: &str) -> (StatusCode, String) {
    send(
        app,
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

/// Helper to make a GET request.
pub async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    request(app, "GET", uri).await
}

/// Helper to make a GET request and parse the body as JSON.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap_or(Value::Null))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body_bytes.to_vec()).unwrap())
}
