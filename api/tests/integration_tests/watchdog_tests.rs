//! Integration tests for the prefix staleness watchdog.
//!
//! Tests cover:
//! - Failure counter raised for a prefix nobody writes to
//! - Stores between audits keeping the prefix fresh
//! - Removing a watch silencing its audits

use axum::http::StatusCode;
use serde_json::json;
use shared::registry::AuditOutcome;
use std::time::Duration;

use super::common::{get, post_json, registration, store, test_app};

fn watched(prefix: &str, name: &str, schedule: &str) -> serde_json::Value {
    let mut body = registration(prefix, name, "counter");
    body["check_schedule"] = json!(schedule);
    body
}

#[tokio::test]
async fn test_audits_without_stores_fail() {
    let (app, state) = test_app();
    let (status, _) = post_json(app.clone(), "/register", watched("batch", "jobs", "@hourly")).await;
    assert_eq!(status, StatusCode::OK);

    let registry = state.registry();
    assert_eq!(registry.audit_prefix("batch"), Some(AuditOutcome::Stale));
    assert_eq!(registry.audit_prefix("batch"), Some(AuditOutcome::Stale));
    assert_eq!(registry.failure_count("batch"), 2);

    let (_, text) = get(app, "/metrics").await;
    assert!(text.contains("pushwatch_prefix_check_failed_total{prefix=\"batch\"} 2"));
}

#[tokio::test]
async fn test_store_between_audits_keeps_prefix_fresh() {
    let (app, state) = test_app();
    post_json(app.clone(), "/register", watched("batch", "jobs", "@hourly")).await;
    let registry = state.registry();

    registry.audit_prefix("batch");
    let (status, _) = post_json(app, "/store", store("batch", "jobs", 1.0)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(registry.audit_prefix("batch"), Some(AuditOutcome::Fresh));
    assert_eq!(registry.failure_count("batch"), 1);
}

#[tokio::test]
async fn test_scheduled_audits_raise_failure_counter() {
    let (app, state) = test_app();
    let registry = state.registry();
    registry.scheduler().start().unwrap();

    let (status, _) = post_json(app.clone(), "/register", watched("batch", "jobs", "@every 40ms")).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(registry.failure_count("batch") >= 1);

    registry.scheduler().stop();
    let (_, text) = get(app, "/metrics").await;
    assert!(text.contains("pushwatch_prefix_check_failed_total{prefix=\"batch\"}"));
}

#[tokio::test]
async fn test_removed_watch_stops_auditing() {
    let (app, state) = test_app();
    let registry = state.registry();
    registry.scheduler().start().unwrap();

    post_json(app, "/register", watched("batch", "jobs", "@every 20ms")).await;
    registry.unregister_prefix_watch("batch").unwrap();
    let failures = registry.failure_count("batch");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.failure_count("batch"), failures);
    assert_eq!(registry.audit_prefix("batch"), None);
    assert!(registry.scheduler().is_empty());

    registry.scheduler().stop();
}
