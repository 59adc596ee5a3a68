//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::metrics::HttpRequestMetrics;
use shared::{MetricRegistry, RegistryError};
use std::sync::Arc;

/// Application state shared across all request handlers.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct AppState {
    /// The metric registry and staleness watchdog.
    registry: Arc<MetricRegistry>,
    /// Request counter served on `/metrics`.
    http_requests: HttpRequestMetrics,
}

impl AppState {
    /// Creates a new application state around `registry`, registering the
    /// request counter with its exposition registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request counter cannot be registered.
    pub fn new(registry: Arc<MetricRegistry>) -> Result<Self, RegistryError> {
        let http_requests = HttpRequestMetrics::register(registry.exposition_registry())?;
        Ok(Self {
            registry,
            http_requests,
        })
    }

    /// Creates a new application state with a fresh registry and a stopped
    /// scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in counters cannot be registered.
    pub fn with_new_registry() -> Result<Self, RegistryError> {
        Self::new(MetricRegistry::new_shared()?)
    }

    /// Returns the metric registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Returns the request counter.
    #[must_use]
    pub fn http_requests(&self) -> &HttpRequestMetrics {
        &self.http_requests
    }
}
