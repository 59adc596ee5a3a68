//! Metric registry and staleness watchdog.
//!
//! [`MetricRegistry`] owns the collector table and the prefix watch state
//! behind one mutex. Every operation, and every audit tick's
//! read-modify-write, runs with that mutex held.
//!
//! Prefix watches are driven by the [`Scheduler`]. A scheduled audit only
//! holds a weak reference to the registry and the prefix it was created
//! for; after the watch is removed, or the registry dropped, it does nothing.
//!
//! # Example
//!
//! ```
//! use shared::models::{MetricDefinition, MetricKind, MetricUpdate};
//! use shared::registry::MetricRegistry;
//!
//! let registry = MetricRegistry::new_shared().unwrap();
//! registry
//!     .register_metric(MetricDefinition::new("batch", "jobs_done", MetricKind::Counter))
//!     .unwrap();
//!
//! registry.store_metric(&MetricUpdate::new("batch", "jobs_done", 3.0)).unwrap();
//! registry.store_metric(&MetricUpdate::new("batch", "jobs_done", 4.0)).unwrap();
//!
//! assert_eq!(registry.current_value("batch", "jobs_done", &[]), Some(7.0));
//! ```

pub mod collector;
pub mod watch;

pub use collector::{Collector, CollectorTable, SeriesEntry, SeriesKey};
pub use watch::{AuditOutcome, PrefixWatch, WatchTable};

use crate::error::RegistryError;
use crate::models::definition::validate_identity;
use crate::models::{MetricDefinition, MetricKind, MetricUpdate, JOB_LABEL};
use crate::scheduler::{Schedule, ScheduleHandle, Scheduler};
use chrono::Utc;
use prometheus::core::Collector as _;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Arc, Mutex, MutexGuard};

/// Name of the counter raised when a watched prefix goes stale.
pub const PREFIX_FAILED_METRIC: &str = "pushwatch_prefix_check_failed_total";

#[derive(Debug, Default)]
struct RegistryState {
    collectors: CollectorTable,
    watches: WatchTable,
}

/// Registry of dynamically registered series plus the staleness watchdog.
pub struct MetricRegistry {
    state: Mutex<RegistryState>,
    exposition: Registry,
    prefix_failed: IntCounterVec,
    scheduler: Arc<Scheduler>,
}

impl MetricRegistry {
    /// Creates a registry whose prefix watches run on `scheduler`.
    ///
    /// # Errors
    ///
    /// Returns an error if the failure counter cannot be registered.
    pub fn new(scheduler: Arc<Scheduler>) -> Result<Arc<Self>, RegistryError> {
        let exposition = Registry::new();
        let prefix_failed = IntCounterVec::new(
            Opts::new(
                PREFIX_FAILED_METRIC,
                "Number of staleness checks that found no new value for a prefix.",
            ),
            &["prefix"],
        )?;
        exposition.register(Box::new(prefix_failed.clone()))?;

        Ok(Arc::new(Self {
            state: Mutex::new(RegistryState::default()),
            exposition,
            prefix_failed,
            scheduler,
        }))
    }

    /// Creates a registry with its own, stopped scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if the failure counter cannot be registered.
    pub fn new_shared() -> Result<Arc<Self>, RegistryError> {
        Self::new(Scheduler::new_shared())
    }

    /// Registers a new series.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ValidationFailed` if the definition is incomplete
    /// - `AlreadyRegistered` if the prefix and name are taken
    /// - `KindConflict` if the name exists under another prefix with a
    ///   different kind
    /// - `Exposition` if the collector cannot be built or exposed
    pub fn register_metric(&self, def: MetricDefinition) -> Result<(), RegistryError> {
        def.validate_definition()?;

        let mut state = self.lock()?;
        let key = SeriesKey::new(&def.prefix, &def.name);
        if state.collectors.contains(&key) {
            return Err(RegistryError::AlreadyRegistered {
                prefix: key.prefix,
                name: key.name,
            });
        }
        // Families sharing a name are merged on scrape and must agree on kind.
        if let Some(other) = state.collectors.find_by_name(&def.name) {
            if other.definition.kind != def.kind {
                return Err(RegistryError::KindConflict {
                    prefix: other.definition.prefix.clone(),
                    name: def.name,
                    existing: other.definition.kind,
                });
            }
        }

        let collector = Collector::new(&def)?;
        self.exposition.register(collector.boxed())?;

        tracing::info!(
            prefix = %def.prefix,
            name = %def.name,
            kind = %def.kind,
            labels = ?def.label_keys,
            "Metric registered"
        );
        state.collectors.insert(
            key,
            SeriesEntry {
                definition: def,
                collector,
            },
        );
        Ok(())
    }

    /// Removes a series. Unknown series are ignored.
    ///
    /// # Errors
    ///
    /// Returns `LockPoisoned` if the registry lock is poisoned.
    pub fn unregister_metric(&self, prefix: &str, name: &str) -> Result<(), RegistryError> {
        let mut state = self.lock()?;
        let key = SeriesKey::new(prefix, name);
        let Some(entry) = state.collectors.remove(&key) else {
            return Ok(());
        };

        if let Err(e) = self.exposition.unregister(entry.collector.boxed()) {
            tracing::warn!(%prefix, %name, error = %e, "Collector was not exposed");
        }
        tracing::info!(%prefix, %name, "Metric unregistered");
        Ok(())
    }

    /// Applies a value to a registered series: counters are incremented,
    /// gauges are set. Refreshes the prefix watch if there is one.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ValidationFailed` if name or prefix is empty
    /// - `NotRegistered` if the series does not exist
    /// - `LabelMismatch` if the labels do not match the registered keys
    /// - `InvalidValue` for a negative or non-finite counter increment
    pub fn store_metric(&self, update: &MetricUpdate) -> Result<(), RegistryError> {
        validate_identity(&update.prefix, &update.name)?;

        let mut guard = self.lock()?;
        let state = &mut *guard;
        let key = SeriesKey::new(&update.prefix, &update.name);
        let entry = state
            .collectors
            .get(&key)
            .ok_or_else(|| RegistryError::NotRegistered {
                prefix: update.prefix.clone(),
                name: update.name.clone(),
            })?;

        let label_values = entry.label_values(&update.labels)?;
        let kind = entry.collector.kind();
        if kind == MetricKind::Counter && !(update.value.is_finite() && update.value >= 0.0) {
            return Err(RegistryError::InvalidValue {
                prefix: update.prefix.clone(),
                name: update.name.clone(),
                kind,
                value: update.value,
            });
        }
        entry.collector.apply(&label_values, update.value)?;

        if let Some(watch) = state.watches.get_mut(&update.prefix) {
            watch.record_update(Utc::now());
        }

        tracing::debug!(
            prefix = %update.prefix,
            name = %update.name,
            value = update.value,
            "Metric stored"
        );
        Ok(())
    }

    /// Starts auditing `prefix` on `schedule_expr`. A prefix that is already
    /// watched keeps its first schedule.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ValidationFailed` if the prefix is empty
    /// - `ScheduleInvalid` if the expression cannot be parsed; no watch is
    ///   created in that case
    pub fn register_prefix_watch(
        self: &Arc<Self>,
        prefix: &str,
        schedule_expr: &str,
    ) -> Result<(), RegistryError> {
        if prefix.is_empty() {
            return Err(RegistryError::ValidationFailed(
                "prefix field cannot be empty".to_string(),
            ));
        }

        // Parsed outside the lock; a bad expression leaves no trace.
        let schedule: Schedule = schedule_expr.parse().inspect_err(|e| {
            tracing::warn!(%prefix, schedule = %schedule_expr, error = %e, "Rejected check schedule");
        })?;

        let mut state = self.lock()?;
        if state.watches.contains(prefix) {
            tracing::debug!(%prefix, "Prefix already watched");
            return Ok(());
        }

        let registry = Arc::downgrade(self);
        let watched = prefix.to_string();
        let handle = self.scheduler.add_parsed(schedule_expr, schedule, move || {
            if let Some(registry) = registry.upgrade() {
                registry.audit_prefix(&watched);
            }
        });

        state
            .watches
            .insert(prefix, PrefixWatch::new(handle, schedule_expr, Utc::now()));
        tracing::info!(%prefix, schedule = %schedule_expr, %handle, "Prefix watch registered");
        Ok(())
    }

    /// Stops auditing `prefix`. Unknown prefixes are ignored.
    ///
    /// # Errors
    ///
    /// Returns `LockPoisoned` if the registry lock is poisoned.
    pub fn unregister_prefix_watch(&self, prefix: &str) -> Result<(), RegistryError> {
        let mut state = self.lock()?;
        if let Some(watch) = state.watches.remove(prefix) {
            self.scheduler.remove(watch.schedule);
            tracing::info!(%prefix, "Prefix watch unregistered");
        }
        Ok(())
    }

    /// Runs one staleness audit for `prefix`.
    ///
    /// This is what the scheduled job calls. Returns `None`, and does
    /// nothing, if the prefix is not watched. Never fails.
    pub fn audit_prefix(&self, prefix: &str) -> Option<AuditOutcome> {
        let Ok(mut state) = self.state.lock() else {
            tracing::error!(%prefix, "Registry lock poisoned, skipping audit");
            return None;
        };
        let watch = state.watches.get_mut(prefix)?;
        let outcome = watch.audit(Utc::now());

        if outcome == AuditOutcome::Stale {
            match self.prefix_failed.get_metric_with_label_values(&[prefix]) {
                Ok(counter) => counter.inc(),
                Err(e) => tracing::error!(%prefix, error = %e, "Failed to raise failure counter"),
            }
            tracing::warn!(%prefix, "No values stored since last check");
        } else {
            tracing::debug!(%prefix, "Prefix is fresh");
        }
        Some(outcome)
    }

    /// Returns true if the series exists.
    #[must_use]
    pub fn has_metric(&self, prefix: &str, name: &str) -> bool {
        self.lock()
            .is_ok_and(|state| state.collectors.contains(&SeriesKey::new(prefix, name)))
    }

    /// Number of registered series.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.lock().map_or(0, |state| state.collectors.len())
    }

    /// Watched prefixes, sorted.
    #[must_use]
    pub fn watched_prefixes(&self) -> Vec<String> {
        self.lock()
            .map(|state| state.watches.prefixes())
            .unwrap_or_default()
    }

    /// Scheduler entry of a watched prefix.
    #[must_use]
    pub fn watch_schedule(&self, prefix: &str) -> Option<ScheduleHandle> {
        self.lock()
            .ok()
            .and_then(|state| state.watches.get(prefix).map(|watch| watch.schedule))
    }

    /// How many audits of `prefix` have failed.
    #[must_use]
    pub fn failure_count(&self, prefix: &str) -> u64 {
        let families = self.prefix_failed.collect();
        let value = find_sample(&families, PREFIX_FAILED_METRIC, &[("prefix", prefix)]);
        // Counter values are whole numbers.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = value.unwrap_or(0.0) as u64;
        count
    }

    /// Current value of one child of a series, if it has been written.
    ///
    /// `labels` are the schema labels; the job label is implied.
    #[must_use]
    pub fn current_value(&self, prefix: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let state = self.lock().ok()?;
        let entry = state.collectors.get(&SeriesKey::new(prefix, name))?;
        let families = entry.collector.boxed().collect();

        let mut wanted = vec![(JOB_LABEL, prefix)];
        wanted.extend_from_slice(labels);
        find_sample(&families, name, &wanted)
    }

    /// Gathers every exposed metric family.
    #[must_use]
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.exposition.gather()
    }

    /// Renders every exposed metric in the text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String, RegistryError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| RegistryError::Exposition(prometheus::Error::Msg(e.to_string())))
    }

    /// Registry used for exposition. Process-level collectors, such as
    /// request counters, are registered here to be served alongside the
    /// dynamic series.
    #[must_use]
    pub fn exposition_registry(&self) -> &Registry {
        &self.exposition
    }

    /// Scheduler driving the prefix watches.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>, RegistryError> {
        self.state.lock().map_err(|_| RegistryError::LockPoisoned)
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Finds the sample of `name` whose label set is exactly `labels`.
fn find_sample(families: &[MetricFamily], name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    families
        .iter()
        .filter(|family| family.get_name() == name)
        .flat_map(|family| family.get_metric().iter())
        .find(|metric| {
            let pairs = metric.get_label();
            pairs.len() == labels.len()
                && labels.iter().all(|(k, v)| {
                    pairs
                        .iter()
                        .any(|pair| pair.get_name() == *k && pair.get_value() == *v)
                })
        })
        .map(|metric| {
            if metric.has_counter() {
                metric.get_counter().get_value()
            } else {
                metric.get_gauge().get_value()
            }
        })
}
