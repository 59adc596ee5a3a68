//! HTTP request accounting.
//!
//! Counts every request by method, matched route and status code, and
//! exposes the counter on `/metrics` next to the dynamic series.

use crate::state::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector as _;
use prometheus::{IntCounterVec, Opts, Registry};

/// Name of the request counter.
pub const HTTP_REQUESTS_METRIC: &str = "pushwatch_http_requests_total";

/// Route label used for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Counter of handled HTTP requests.
#[derive(Clone)]
pub struct HttpRequestMetrics {
    requests: IntCounterVec,
}

impl HttpRequestMetrics {
    /// Creates the counter and registers it with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector with the same name is already
    /// registered.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests = IntCounterVec::new(
            Opts::new(HTTP_REQUESTS_METRIC, "Total number of HTTP requests."),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(requests.clone()))?;
        Ok(Self { requests })
    }

    /// Records one request.
    pub fn record(&self, method: &str, path: &str, status: StatusCode) {
        match self
            .requests
            .get_metric_with_label_values(&[method, path, status.as_str()])
        {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::error!(error = %e, "Failed to record HTTP request"),
        }
    }

    /// Number of requests recorded for the given labels.
    #[must_use]
    pub fn count(&self, method: &str, path: &str, status: StatusCode) -> u64 {
        let wanted = [("method", method), ("path", path), ("status", status.as_str())];
        self.requests
            .collect()
            .iter()
            .flat_map(|family| family.get_metric().iter())
            .find(|metric| {
                wanted.iter().all(|(k, v)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_name() == *k && pair.get_value() == *v)
                })
            })
            .map_or(0, |metric| {
                // Counter values are whole numbers.
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let count = metric.get_counter().get_value() as u64;
                count
            })
    }
}

/// Middleware recording every request in [`HttpRequestMetrics`].
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_PATH.to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;
    state
        .http_requests()
        .record(&method, &path, response.status());
    response
}
