//! Integration tests for `GET /metrics`.
//!
//! Tests cover:
//! - Rendering of pushed series with the job label
//! - The request counter
//! - Removal of unregistered series

use axum::http::StatusCode;
use serde_json::json;

use super::common::{get, post_json, registration, store, test_app};

#[tokio::test]
async fn test_scrape_shows_pushed_values() {
    let (app, _state) = test_app();

    let mut body = registration("batch", "jobs_done", "counter");
    body["help"] = json!("Finished jobs");
    post_json(app.clone(), "/register", body).await;
    post_json(app.clone(), "/store", store("batch", "jobs_done", 3.0)).await;
    post_json(app.clone(), "/store", store("batch", "jobs_done", 4.0)).await;

    let (status, text) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("# HELP jobs_done Finished jobs"));
    assert!(text.contains("# TYPE jobs_done counter"));
    assert!(text.contains("jobs_done{job_name=\"batch\"} 7"));
}

#[tokio::test]
async fn test_scrape_shows_labelled_series() {
    let (app, _state) = test_app();

    let register = json!({
        "metrics_name": "queue_depth",
        "prefix": "batch",
        "type": "gauge",
        "labels": [{"queue": ""}]
    });
    post_json(app.clone(), "/register", register).await;
    let value = json!({
        "metrics_name": "queue_depth",
        "prefix": "batch",
        "labels": [{"queue": "emails"}],
        "value": 42
    });
    post_json(app.clone(), "/store", value).await;

    let (_, text) = get(app, "/metrics").await;
    assert!(text.contains("# HELP queue_depth Gauge for metric queue_depth"));
    assert!(text.contains("queue_depth{job_name=\"batch\",queue=\"emails\"} 42"));
}

#[tokio::test]
async fn test_scrape_counts_requests() {
    let (app, _state) = test_app();

    post_json(app.clone(), "/store", store("p", "missing", 1.0)).await;

    let (_, text) = get(app, "/metrics").await;
    assert!(text.contains(
        "pushwatch_http_requests_total{method=\"POST\",path=\"/store\",status=\"400\"} 1"
    ));
}

#[tokio::test]
async fn test_unregistered_series_disappears() {
    let (app, state) = test_app();

    post_json(app.clone(), "/register", registration("batch", "jobs_done", "counter")).await;
    post_json(app.clone(), "/store", store("batch", "jobs_done", 1.0)).await;
    state.registry().unregister_metric("batch", "jobs_done").unwrap();

    let (_, text) = get(app.clone(), "/metrics").await;
    assert!(!text.contains("jobs_done"));

    // The identity can be registered again from scratch.
    let (status, _) = post_json(app, "/register", registration("batch", "jobs_done", "gauge")).await;
    assert_eq!(status, StatusCode::OK);
}
