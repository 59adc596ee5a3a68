//! Metric definitions and value updates.
//!
//! A [`MetricDefinition`] is the validated, immutable description of one
//! registered series. A [`MetricUpdate`] is one value pushed into it.

use crate::error::RegistryError;
use crate::models::request::{flatten_labels, RegistrationRequest, StoreRequest};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Label carrying the prefix on every exposed series.
pub const JOB_LABEL: &str = "job_name";

/// Kind of a registered series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic counter; stored values are added.
    Counter,
    /// Gauge; stored values replace the current value.
    Gauge,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::Gauge => write!(f, "gauge"),
        }
    }
}

impl FromStr for MetricKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(RegistryError::ValidationFailed(
                "type field cannot be empty".to_string(),
            )),
            "counter" => Ok(Self::Counter),
            "gauge" => Ok(Self::Gauge),
            other => Err(RegistryError::InvalidType(other.to_string())),
        }
    }
}

/// Validated description of one series.
///
/// # Example
///
/// ```
/// use shared::models::{MetricDefinition, MetricKind};
///
/// let def = MetricDefinition::new("batch", "jobs_done", MetricKind::Counter)
///     .with_label_key("queue");
///
/// assert_eq!(def.help, "Counter for metric jobs_done");
/// assert_eq!(def.label_keys, vec!["queue".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Prefix (job) the series belongs to.
    pub prefix: String,
    /// Series name, unique within the prefix.
    pub name: String,
    /// Label keys in declaration order, excluding the job label.
    pub label_keys: Vec<String>,
    /// Counter or gauge.
    pub kind: MetricKind,
    /// Help text shown in the exposition output.
    pub help: String,
}

impl MetricDefinition {
    /// Creates a definition without labels and with the generated help text.
    #[must_use]
    pub fn new(prefix: impl Into<String>, name: impl Into<String>, kind: MetricKind) -> Self {
        let name = name.into();
        Self {
            prefix: prefix.into(),
            help: default_help(kind, &name),
            name,
            label_keys: Vec::new(),
            kind,
        }
    }

    /// Appends a label key.
    #[must_use]
    pub fn with_label_key(mut self, key: impl Into<String>) -> Self {
        self.label_keys.push(key.into());
        self
    }

    /// Replaces the help text. An empty string keeps the generated one.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        let help = help.into();
        if !help.is_empty() {
            self.help = help;
        }
        self
    }

    /// Checks that name and prefix are present and that the label keys are
    /// usable.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` if:
    /// - name or prefix is empty
    /// - a label key is empty, repeated, or the reserved job label
    pub fn validate_definition(&self) -> Result<(), RegistryError> {
        validate_identity(&self.prefix, &self.name)?;

        let mut seen = std::collections::HashSet::new();
        for key in &self.label_keys {
            if key.is_empty() {
                return Err(RegistryError::ValidationFailed(
                    "label key cannot be empty".to_string(),
                ));
            }
            if key == JOB_LABEL {
                return Err(RegistryError::ValidationFailed(format!(
                    "label key '{JOB_LABEL}' is reserved"
                )));
            }
            if !seen.insert(key.as_str()) {
                return Err(RegistryError::ValidationFailed(format!(
                    "duplicate label key '{key}'"
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<RegistrationRequest> for MetricDefinition {
    type Error = RegistryError;

    fn try_from(req: RegistrationRequest) -> Result<Self, Self::Error> {
        req.validate()?;
        let kind: MetricKind = req.metric_type.parse()?;

        let mut def = Self::new(req.prefix, req.metrics_name, kind);
        // Registration-time label values are informational; only the keys matter.
        def.label_keys = flatten_labels(&req.labels)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        if let Some(help) = req.help {
            def = def.with_help(help);
        }
        def.validate_definition()?;
        Ok(def)
    }
}

/// One value pushed into a registered series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricUpdate {
    /// Prefix (job) of the target series.
    pub prefix: String,
    /// Name of the target series.
    pub name: String,
    /// Label values keyed by label name.
    pub labels: Vec<(String, String)>,
    /// Increment for counters, new value for gauges.
    pub value: f64,
}

impl MetricUpdate {
    /// Creates an update without labels.
    #[must_use]
    pub fn new(prefix: impl Into<String>, name: impl Into<String>, value: f64) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
            labels: Vec::new(),
            value,
        }
    }

    /// Adds a label value.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }
}

impl From<StoreRequest> for MetricUpdate {
    fn from(req: StoreRequest) -> Self {
        Self {
            labels: flatten_labels(&req.labels),
            prefix: req.prefix,
            name: req.metrics_name,
            value: req.value,
        }
    }
}

pub(crate) fn validate_identity(prefix: &str, name: &str) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::ValidationFailed(
            "name field cannot be empty".to_string(),
        ));
    }
    if prefix.is_empty() {
        return Err(RegistryError::ValidationFailed(
            "prefix field cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn default_help(kind: MetricKind, name: &str) -> String {
    match kind {
        MetricKind::Counter => format!("Counter for metric {name}"),
        MetricKind::Gauge => format!("Gauge for metric {name}"),
    }
}
