use dashmap::DashMap;
use std::sync::Arc;

use crate::series::{RequestSeries, SeriesSnapshot};

/// Identifies one series: `scope` groups series (e.g. a protocol),
/// `name` is the request name within the scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub scope: Arc<str>,
    pub name: Arc<str>,
}

impl SeriesKey {
    pub fn new(scope: &str, name: &str) -> Self {
        Self {
            scope: Arc::from(scope),
            name: Arc::from(name),
        }
    }
}

/// Keyed series storage shared by all writers of a run.
#[derive(Debug, Default)]
pub struct SeriesRegistry {
    series: DashMap<SeriesKey, Arc<RequestSeries>>,
}

impl SeriesRegistry {
    /// Returns the series for `(scope, name)`, creating it on first use.
    pub fn series(&self, scope: &str, name: &str) -> Arc<RequestSeries> {
        let key = SeriesKey::new(scope, name);
        if let Some(existing) = self.series.get(&key) {
            return existing.clone();
        }

        self.series
            .entry(key)
            .or_insert_with(|| Arc::new(RequestSeries::default()))
            .clone()
    }

    /// Snapshot of every series, sorted by key for stable output.
    pub fn snapshot(&self) -> Vec<(SeriesKey, SeriesSnapshot)> {
        let mut out: Vec<(SeriesKey, SeriesSnapshot)> = self
            .series
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect();

        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
