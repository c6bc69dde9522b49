//! Reading store port: the telemetry time-series.

use std::future::Future;

use farmhub_domain::error::FarmHubError;
use farmhub_domain::reading::{LatestSnapshot, Reading, TimeRange};
use farmhub_domain::time::Timestamp;

/// Append-only store of [`Reading`]s, keyed by `(farm_id, sensor_id, metric_type)`.
///
/// Implementations must be safe under concurrent reads and writes: a read that
/// starts after a write has returned observes that write, and points inside a
/// series stay ordered by timestamp whatever their arrival order.
pub trait ReadingStore {
    /// Append a reading.
    ///
    /// Rejects readings with an empty `farm_id`, `sensor_id` or `metric_type`
    /// with [`FarmHubError::Validation`].
    fn write(&self, reading: Reading) -> impl Future<Output = Result<(), FarmHubError>> + Send;

    /// The most recent value of every series of `farm_id` that received a
    /// point inside the recency window, keyed `sensor_id:metric_type`.
    fn latest_for_farm(
        &self,
        farm_id: &str,
    ) -> impl Future<Output = Result<LatestSnapshot, FarmHubError>> + Send;

    /// The most recent reading of one sensor/metric inside the recency window.
    fn latest(
        &self,
        sensor_id: &str,
        metric_type: &str,
    ) -> impl Future<Output = Result<Option<Reading>, FarmHubError>> + Send;

    /// Every reading of `metric_type` for `farm_id` within `range`, oldest first.
    fn range_for_farm(
        &self,
        farm_id: &str,
        metric_type: &str,
        range: TimeRange,
    ) -> impl Future<Output = Result<Vec<Reading>, FarmHubError>> + Send;

    /// Drop every reading older than `before`. Returns how many were removed.
    fn purge_before(
        &self,
        before: Timestamp,
    ) -> impl Future<Output = Result<u64, FarmHubError>> + Send;
}

impl<T: ReadingStore + Send + Sync> ReadingStore for std::sync::Arc<T> {
    fn write(&self, reading: Reading) -> impl Future<Output = Result<(), FarmHubError>> + Send {
        (**self).write(reading)
    }

    fn latest_for_farm(
        &self,
        farm_id: &str,
    ) -> impl Future<Output = Result<LatestSnapshot, FarmHubError>> + Send {
        (**self).latest_for_farm(farm_id)
    }

    fn latest(
        &self,
        sensor_id: &str,
        metric_type: &str,
    ) -> impl Future<Output = Result<Option<Reading>, FarmHubError>> + Send {
        (**self).latest(sensor_id, metric_type)
    }

    fn range_for_farm(
        &self,
        farm_id: &str,
        metric_type: &str,
        range: TimeRange,
    ) -> impl Future<Output = Result<Vec<Reading>, FarmHubError>> + Send {
        (**self).range_for_farm(farm_id, metric_type, range)
    }

    fn purge_before(
        &self,
        before: Timestamp,
    ) -> impl Future<Output = Result<u64, FarmHubError>> + Send {
        (**self).purge_before(before)
    }
}
