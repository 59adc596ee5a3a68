//! Collector table.
//!
//! Maps a series identity to the live counter or gauge vector backing it.

use crate::error::RegistryError;
use crate::models::{MetricDefinition, MetricKind, JOB_LABEL};
use prometheus::{CounterVec, GaugeVec, Opts};
use std::collections::HashMap;

/// Identity of a registered series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    /// Prefix (job) of the series.
    pub prefix: String,
    /// Name of the series.
    pub name: String,
}

impl SeriesKey {
    /// Creates a key.
    #[must_use]
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.prefix, self.name)
    }
}

/// The exposable object behind one series.
///
/// The job label is a constant label fixed to the prefix, so the label
/// values passed to [`Collector::apply`] are only the schema keys' values.
#[derive(Clone)]
pub enum Collector {
    /// Values are added.
    Counter(CounterVec),
    /// Values replace the current value.
    Gauge(GaugeVec),
}

impl Collector {
    /// Builds the collector described by `def`.
    ///
    /// # Errors
    ///
    /// Returns an error if the exposition library rejects the name, help
    /// text or label keys.
    pub fn new(def: &MetricDefinition) -> Result<Self, prometheus::Error> {
        let opts = Opts::new(def.name.clone(), def.help.clone())
            .const_label(JOB_LABEL, def.prefix.clone());
        let keys: Vec<&str> = def.label_keys.iter().map(String::as_str).collect();

        match def.kind {
            MetricKind::Counter => CounterVec::new(opts, &keys).map(Self::Counter),
            MetricKind::Gauge => GaugeVec::new(opts, &keys).map(Self::Gauge),
        }
    }

    /// Kind of the collector.
    #[must_use]
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
        }
    }

    /// Adds `delta` (counter) or sets `value` (gauge) on the child addressed
    /// by `label_values`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of label values does not match the
    /// collector's label keys.
    pub fn apply(&self, label_values: &[&str], value: f64) -> Result<(), prometheus::Error> {
        match self {
            Self::Counter(vec) => vec.get_metric_with_label_values(label_values)?.inc_by(value),
            Self::Gauge(vec) => vec.get_metric_with_label_values(label_values)?.set(value),
        }
        Ok(())
    }

    /// Boxed handle for registering with an exposition registry.
    #[must_use]
    pub fn boxed(&self) -> Box<dyn prometheus::core::Collector> {
        match self {
            Self::Counter(vec) => Box::new(vec.clone()),
            Self::Gauge(vec) => Box::new(vec.clone()),
        }
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Collector").field(&self.kind()).finish()
    }
}

/// A registered series: its definition and live collector.
#[derive(Debug, Clone)]
pub struct SeriesEntry {
    /// Definition given at registration.
    pub definition: MetricDefinition,
    /// Live collector.
    pub collector: Collector,
}

impl SeriesEntry {
    /// Orders the supplied `(key, value)` pairs by the registered key order.
    ///
    /// # Errors
    ///
    /// Returns `LabelMismatch` if a key is missing, unknown or repeated.
    pub fn label_values<'a>(
        &self,
        labels: &'a [(String, String)],
    ) -> Result<Vec<&'a str>, RegistryError> {
        let def = &self.definition;
        let mismatch = || RegistryError::LabelMismatch {
            prefix: def.prefix.clone(),
            name: def.name.clone(),
            expected: def.label_keys.join(","),
        };

        if labels.len() != def.label_keys.len() {
            return Err(mismatch());
        }

        def.label_keys
            .iter()
            .map(|key| {
                let mut matches = labels.iter().filter(|(k, _)| k == key);
                match (matches.next(), matches.next()) {
                    (Some((_, value)), None) => Ok(value.as_str()),
                    _ => Err(mismatch()),
                }
            })
            .collect()
    }
}

/// Owns every registered series.
#[derive(Debug, Default)]
pub struct CollectorTable {
    entries: HashMap<SeriesKey, SeriesEntry>,
}

impl CollectorTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the series exists.
    #[must_use]
    pub fn contains(&self, key: &SeriesKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up a series.
    #[must_use]
    pub fn get(&self, key: &SeriesKey) -> Option<&SeriesEntry> {
        self.entries.get(key)
    }

    /// Installs a series, returning the previous entry for the key if any.
    pub fn insert(&mut self, key: SeriesKey, entry: SeriesEntry) -> Option<SeriesEntry> {
        self.entries.insert(key, entry)
    }

    /// Removes a series.
    pub fn remove(&mut self, key: &SeriesKey) -> Option<SeriesEntry> {
        self.entries.remove(key)
    }

    /// Number of registered series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no series are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Any series registered under `name`, whatever its prefix.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&SeriesEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key.name == name)
            .map(|(_, entry)| entry)
    }

    /// Keys of all series, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<SeriesKey> {
        let mut keys: Vec<SeriesKey> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}
