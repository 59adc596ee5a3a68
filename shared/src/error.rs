//! Error types for registry and scheduler operations.

use thiserror::Error;

/// Errors returned by [`crate::registry::MetricRegistry`] operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required field was missing or empty.
    #[error("{0}")]
    ValidationFailed(String),

    /// A series with the same prefix and name already exists.
    #[error("metric {prefix}_{name} already registered")]
    AlreadyRegistered {
        /// Prefix of the series.
        prefix: String,
        /// Name of the series.
        name: String,
    },

    /// The name is registered under another prefix with a different kind.
    #[error("metric {name} is already registered as a {existing} under prefix {prefix}")]
    KindConflict {
        /// Prefix holding the existing series.
        prefix: String,
        /// Name shared by both series.
        name: String,
        /// Kind of the existing series.
        existing: crate::models::MetricKind,
    },

    /// No series exists for the given prefix and name.
    #[error("metric {prefix}_{name} not registered")]
    NotRegistered {
        /// Prefix of the series.
        prefix: String,
        /// Name of the series.
        name: String,
    },

    /// The metric kind is not one of the supported kinds.
    #[error("unknown metric type: {0}")]
    InvalidType(String),

    /// The staleness check schedule could not be parsed.
    #[error("invalid check schedule '{expr}': {reason}")]
    ScheduleInvalid {
        /// The offending expression.
        expr: String,
        /// Parser message.
        reason: String,
    },

    /// The supplied labels do not match the registered label keys.
    #[error("labels for metric {prefix}_{name} do not match registered keys [{expected}]")]
    LabelMismatch {
        /// Prefix of the series.
        prefix: String,
        /// Name of the series.
        name: String,
        /// Comma separated list of the registered keys.
        expected: String,
    },

    /// The value cannot be applied to the series.
    #[error("invalid value {value} for {kind} {prefix}_{name}")]
    InvalidValue {
        /// Prefix of the series.
        prefix: String,
        /// Name of the series.
        name: String,
        /// Kind of the series.
        kind: crate::models::MetricKind,
        /// The rejected value.
        value: f64,
    },

    /// The exposition library rejected the collector.
    #[error("exposition error: {0}")]
    Exposition(#[from] prometheus::Error),

    /// Failed to acquire the registry lock.
    #[error("Failed to acquire lock on metric registry")]
    LockPoisoned,
}

impl RegistryError {
    /// Returns true when the error was caused by the caller's input rather
    /// than by server-side state.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed(_)
                | Self::NotRegistered { .. }
                | Self::InvalidType(_)
                | Self::ScheduleInvalid { .. }
                | Self::InvalidValue { .. }
        )
    }
}

impl From<validator::ValidationErrors> for RegistryError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
                })
            })
            .collect();
        messages.sort();
        Self::ValidationFailed(messages.join("; "))
    }
}

impl From<SchedulerError> for RegistryError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::ScheduleInvalid { expr, reason } => {
                Self::ScheduleInvalid { expr, reason }
            }
            SchedulerError::NoRuntime => Self::ScheduleInvalid {
                expr: String::new(),
                reason: err.to_string(),
            },
        }
    }
}

/// Errors returned by [`crate::scheduler::Scheduler`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The schedule expression could not be parsed.
    #[error("invalid schedule '{expr}': {reason}")]
    ScheduleInvalid {
        /// The offending expression.
        expr: String,
        /// Parser message.
        reason: String,
    },

    /// `start` was called outside a tokio runtime.
    #[error("scheduler must be started from within a tokio runtime")]
    NoRuntime,
}
