//! Prefix watch state and the staleness check.
//!
//! Each watched prefix keeps two clocks: when a value was last stored under
//! it and when it was last audited. An audit fails when nothing was stored
//! since the previous audit, then rearms the audit clock.

use crate::scheduler::ScheduleHandle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Result of one audit tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// A store was observed since the previous audit.
    Fresh,
    /// Nothing was stored since the previous audit.
    Stale,
}

/// Watch bookkeeping for one prefix.
#[derive(Debug, Clone)]
pub struct PrefixWatch {
    /// Most recent successful store under the prefix; `None` until the
    /// first store after the watch was created.
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Most recent audit, or the creation time before the first audit.
    pub last_checked_at: DateTime<Utc>,
    /// Scheduler entry driving the audits.
    pub schedule: ScheduleHandle,
    /// Expression the entry was created from.
    pub schedule_expr: String,
}

impl PrefixWatch {
    /// Creates a watch whose audit window opens at `now`.
    #[must_use]
    pub fn new(schedule: ScheduleHandle, schedule_expr: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            last_updated_at: None,
            last_checked_at: now,
            schedule,
            schedule_expr: schedule_expr.into(),
        }
    }

    /// Records a store.
    pub fn record_update(&mut self, now: DateTime<Utc>) {
        self.last_updated_at = Some(now);
    }

    /// Returns the outcome an audit at this moment would have, without
    /// rearming the clock.
    #[must_use]
    pub fn outcome(&self) -> AuditOutcome {
        match self.last_updated_at {
            // Ties count as fresh.
            Some(updated) if updated >= self.last_checked_at => AuditOutcome::Fresh,
            _ => AuditOutcome::Stale,
        }
    }

    /// Runs one audit and rearms the audit clock to `now`.
    pub fn audit(&mut self, now: DateTime<Utc>) -> AuditOutcome {
        let outcome = self.outcome();
        self.last_checked_at = now;
        outcome
    }
}

/// Watch state for every watched prefix.
#[derive(Debug, Default)]
pub struct WatchTable {
    watches: HashMap<String, PrefixWatch>,
}

impl WatchTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `prefix` is watched.
    #[must_use]
    pub fn contains(&self, prefix: &str) -> bool {
        self.watches.contains_key(prefix)
    }

    /// Looks up a watch.
    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&PrefixWatch> {
        self.watches.get(prefix)
    }

    /// Looks up a watch for mutation.
    pub fn get_mut(&mut self, prefix: &str) -> Option<&mut PrefixWatch> {
        self.watches.get_mut(prefix)
    }

    /// Installs a watch.
    pub fn insert(&mut self, prefix: impl Into<String>, watch: PrefixWatch) {
        self.watches.insert(prefix.into(), watch);
    }

    /// Removes a watch.
    pub fn remove(&mut self, prefix: &str) -> Option<PrefixWatch> {
        self.watches.remove(prefix)
    }

    /// Watched prefixes, sorted.
    #[must_use]
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self.watches.keys().cloned().collect();
        prefixes.sort();
        prefixes
    }

    /// Number of watched prefixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Returns true if nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }
}
