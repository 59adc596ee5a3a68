//! Wire-level request bodies.
//!
//! These are the JSON shapes accepted by the `/register` and `/store`
//! endpoints and produced by the CLI client.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Label list as it appears on the wire: `[{"key": "value"}, ...]`.
pub type LabelList = Vec<BTreeMap<String, String>>;

/// Request to register a new metric series.
///
/// # Example
///
/// ```
/// use shared::models::RegistrationRequest;
///
/// let req: RegistrationRequest = serde_json::from_str(
///     r#"{"metrics_name": "jobs_done", "prefix": "batch", "type": "counter",
///         "labels": [{"queue": "default"}], "check_schedule": "@every 1m"}"#,
/// )
/// .unwrap();
///
/// assert_eq!(req.metric_type, "counter");
/// assert_eq!(req.check_schedule.as_deref(), Some("@every 1m"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct RegistrationRequest {
    /// Name of the series.
    #[validate(length(min = 1, message = "name field cannot be empty"))]
    #[serde(default)]
    pub metrics_name: String,

    /// Label schema; the keys become the series' label names.
    #[serde(default)]
    pub labels: LabelList,

    /// Prefix (job) the series belongs to.
    #[validate(length(min = 1, message = "prefix field cannot be empty"))]
    #[serde(default)]
    pub prefix: String,

    /// Metric kind, `counter` or `gauge`.
    #[validate(length(min = 1, message = "type field cannot be empty"))]
    #[serde(rename = "type", default)]
    pub metric_type: String,

    /// Optional staleness check schedule for the whole prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_schedule: Option<String>,

    /// Optional help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// Request to push a value into a registered series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct StoreRequest {
    /// Name of the series.
    #[validate(length(min = 1, message = "name field cannot be empty"))]
    #[serde(default)]
    pub metrics_name: String,

    /// Prefix (job) the series belongs to.
    #[validate(length(min = 1, message = "prefix field cannot be empty"))]
    #[serde(default)]
    pub prefix: String,

    /// Label values, keyed by the label names given at registration.
    #[serde(default)]
    pub labels: LabelList,

    /// Value to add (counter) or set (gauge).
    pub value: f64,
}

/// Flattens a wire label list into ordered `(key, value)` pairs.
///
/// List order is kept; keys inside one object come out sorted.
#[must_use]
pub fn flatten_labels(labels: &[BTreeMap<String, String>]) -> Vec<(String, String)> {
    labels
        .iter()
        .flat_map(|entry| entry.iter().map(|(k, v)| (k.clone(), v.clone())))
        .collect()
}
