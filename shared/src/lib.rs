//! Pushwatch Shared Library
//!
//! This crate contains the core of the Pushwatch metrics gateway: the
//! registry of dynamically registered series and the staleness watchdog
//! that audits watched prefixes on a schedule.
//!
//! # Modules
//!
//! - [`models`] - Wire requests, metric definitions and value updates
//! - [`registry`] - Collector table, prefix watch state and the registry
//! - [`scheduler`] - Cron-style scheduler driving the staleness checks
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```
//! use shared::models::{MetricDefinition, RegistrationRequest};
//!
//! let req: RegistrationRequest = serde_json::from_str(
//!     r#"{"metrics_name": "queue_depth", "prefix": "worker", "type": "gauge",
//!         "labels": [{"queue": "default"}]}"#,
//! )
//! .unwrap();
//!
//! let def = MetricDefinition::try_from(req).unwrap();
//! assert_eq!(def.label_keys, vec!["queue".to_string()]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod models;
pub mod registry;
pub mod scheduler;

pub use error::{RegistryError, SchedulerError};
pub use registry::MetricRegistry;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use prometheus;
pub use serde;
pub use serde_json;
pub use validator;
