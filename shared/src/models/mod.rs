//! Data models for the Pushwatch gateway.
//!
//! Wire requests, validated metric definitions and value updates.

pub mod definition;
pub mod request;

pub use definition::{MetricDefinition, MetricKind, MetricUpdate, JOB_LABEL};
pub use request::{flatten_labels, LabelList, RegistrationRequest, StoreRequest};
