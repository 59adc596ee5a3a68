//! Metrics collection module for internal observability.
//!
//! This module provides the counters Pushwatch keeps about itself, served
//! on `/metrics` alongside the registered series.

pub mod http_requests;

pub use http_requests::{track_requests, HttpRequestMetrics, HTTP_REQUESTS_METRIC};
