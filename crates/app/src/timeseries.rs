//! In-memory time-series store.
//!
//! Used by the daemon when `storage.readings = "memory"` and as the reference
//! [`ReadingStore`] in tests. Each series is a `Vec` kept sorted by timestamp.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

use chrono::Duration;
use farmhub_domain::error::FarmHubError;
use farmhub_domain::reading::{LatestSnapshot, Reading, TimeRange};
use farmhub_domain::time::{Timestamp, now, saturating_sub};

use crate::ports::ReadingStore;

/// Default lookback for "latest" queries.
pub const DEFAULT_RECENCY_WINDOW: Duration = Duration::hours(24);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    farm_id: String,
    sensor_id: String,
    metric_type: String,
}

impl SeriesKey {
    fn of(reading: &Reading) -> Self {
        Self {
            farm_id: reading.farm_id.clone(),
            sensor_id: reading.sensor_id.clone(),
            metric_type: reading.metric_type.clone(),
        }
    }
}

/// Thread-safe in-memory [`ReadingStore`].
#[derive(Debug)]
pub struct InMemoryReadingStore {
    series: RwLock<HashMap<SeriesKey, Vec<Reading>>>,
    recency_window: Duration,
}

impl Default for InMemoryReadingStore {
    fn default() -> Self {
        Self::new(DEFAULT_RECENCY_WINDOW)
    }
}

impl InMemoryReadingStore {
    /// Create an empty store whose "latest" queries look back `recency_window`.
    #[must_use]
    pub fn new(recency_window: Duration) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            recency_window,
        }
    }

    /// Total number of stored points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<SeriesKey, Vec<Reading>>> {
        self.series.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<SeriesKey, Vec<Reading>>> {
        self.series.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn recent_since(&self) -> Timestamp {
        saturating_sub(now(), self.recency_window)
    }

    fn insert(&self, reading: Reading) -> Result<(), FarmHubError> {
        reading.validate()?;
        let mut series = self.write_lock();
        let points = series.entry(SeriesKey::of(&reading)).or_default();
        // Insert after every point with an equal timestamp so ties keep arrival order.
        let at = points.partition_point(|p| p.timestamp <= reading.timestamp);
        points.insert(at, reading);
        Ok(())
    }

    fn snapshot(&self, farm_id: &str) -> LatestSnapshot {
        let since = self.recent_since();
        self.read()
            .iter()
            .filter(|(key, _)| key.farm_id == farm_id)
            .filter_map(|(_, points)| points.last())
            .filter(|last| last.timestamp >= since)
            .cloned()
            .collect()
    }

    fn find_latest(&self, sensor_id: &str, metric_type: &str) -> Option<Reading> {
        let since = self.recent_since();
        self.read()
            .iter()
            .filter(|(key, _)| key.sensor_id == sensor_id && key.metric_type == metric_type)
            .filter_map(|(_, points)| points.last())
            .filter(|last| last.timestamp >= since)
            .max_by_key(|last| last.timestamp)
            .cloned()
    }

    fn find_range(&self, farm_id: &str, metric_type: &str, range: TimeRange) -> Vec<Reading> {
        let mut found: Vec<Reading> = self
            .read()
            .iter()
            .filter(|(key, _)| key.farm_id == farm_id && key.metric_type == metric_type)
            .flat_map(|(_, points)| points.iter().filter(move |p| range.contains(p.timestamp)))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.timestamp);
        found
    }

    fn purge(&self, before: Timestamp) -> u64 {
        let mut series = self.write_lock();
        let mut removed = 0_u64;
        series.retain(|_, points| {
            let cut = points.partition_point(|p| p.timestamp < before);
            removed += cut as u64;
            points.drain(..cut);
            !points.is_empty()
        });
        removed
    }
}

impl ReadingStore for InMemoryReadingStore {
    fn write(&self, reading: Reading) -> impl Future<Output = Result<(), FarmHubError>> + Send {
        let result = self.insert(reading);
        async move { result }
    }

    fn latest_for_farm(
        &self,
        farm_id: &str,
    ) -> impl Future<Output = Result<LatestSnapshot, FarmHubError>> + Send {
        let snapshot = self.snapshot(farm_id);
        async move { Ok(snapshot) }
    }

    fn latest(
        &self,
        sensor_id: &str,
        metric_type: &str,
    ) -> impl Future<Output = Result<Option<Reading>, FarmHubError>> + Send {
        let found = self.find_latest(sensor_id, metric_type);
        async move { Ok(found) }
    }

    fn range_for_farm(
        &self,
        farm_id: &str,
        metric_type: &str,
        range: TimeRange,
    ) -> impl Future<Output = Result<Vec<Reading>, FarmHubError>> + Send {
        let found = self.find_range(farm_id, metric_type, range);
        async move { Ok(found) }
    }

    fn purge_before(
        &self,
        before: Timestamp,
    ) -> impl Future<Output = Result<u64, FarmHubError>> + Send {
        let removed = self.purge(before);
        async move { Ok(removed) }
    }
}
