//! Ingest service: decode one inbound telemetry message and store it.

use std::sync::atomic::{AtomicU64, Ordering};

use farmhub_domain::error::{DecodeError, FarmHubError, ValidationError};
use farmhub_domain::reading::Reading;
use farmhub_domain::telemetry::TelemetryDecoder;

use crate::ports::ReadingStore;

/// Why an inbound message did not make it into the store.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    InvalidReading(ValidationError),

    #[error("failed to store reading")]
    Store(#[source] FarmHubError),
}

impl From<FarmHubError> for IngestError {
    fn from(err: FarmHubError) -> Self {
        match err {
            FarmHubError::Validation(inner) => Self::InvalidReading(inner),
            other => Self::Store(other),
        }
    }
}

/// Counters of accepted and rejected messages.
#[derive(Debug, Default)]
pub struct IngestStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl IngestStats {
    #[must_use]
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Write path of the pipeline: decoder followed by the store.
///
/// `handle` is safe to call concurrently; the MQTT adapter spawns one task per
/// inbound message.
pub struct IngestService<S> {
    decoder: TelemetryDecoder,
    store: S,
    stats: IngestStats,
}

impl<S: ReadingStore> IngestService<S> {
    pub fn new(decoder: TelemetryDecoder, store: S) -> Self {
        Self {
            decoder,
            store,
            stats: IngestStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decode `payload` received on `topic` and append the reading.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Decode`] for malformed topics or payloads,
    /// [`IngestError::InvalidReading`] when the store rejects the reading,
    /// or [`IngestError::Store`] when the store fails.
    #[tracing::instrument(skip(self, payload), fields(len = payload.len()))]
    pub async fn handle(&self, topic: &str, payload: &[u8]) -> Result<Reading, IngestError> {
        let result = self.decode_and_write(topic, payload).await;
        match &result {
            Ok(_) => {
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %err, "rejected telemetry message");
            }
        }
        result
    }

    async fn decode_and_write(&self, topic: &str, payload: &[u8]) -> Result<Reading, IngestError> {
        let reading = self.decoder.decode(topic, payload)?;
        self.store.write(reading.clone()).await?;
        tracing::debug!(
            farm_id = %reading.farm_id,
            sensor_id = %reading.sensor_id,
            metric_type = %reading.metric_type,
            value = reading.value,
            "stored reading"
        );
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use farmhub_domain::error::ReadingField;
    use farmhub_domain::reading::{LatestSnapshot, TimeRange};
    use farmhub_domain::time::Timestamp;

    use super::*;
    use crate::timeseries::InMemoryReadingStore;

    fn service() -> IngestService<InMemoryReadingStore> {
        IngestService::new(TelemetryDecoder::new("fx"), InMemoryReadingStore::default())
    }

    #[tokio::test]
    async fn should_store_decoded_reading() {
        let svc = service();
        let reading = svc
            .handle("fx/data/7/pump-sensor-1/temperature", br#"{"value": 42.5}"#)
            .await
            .unwrap();

        assert_eq!(reading.sensor_id, "pump-sensor-1");
        let snapshot = svc.store().latest_for_farm("7").await.unwrap();
        assert_eq!(snapshot.get("pump-sensor-1", "temperature"), Some(42.5));
        assert_eq!(svc.stats().accepted(), 1);
        assert_eq!(svc.stats().rejected(), 0);
    }

    #[tokio::test]
    async fn should_not_write_when_topic_is_malformed() {
        let svc = service();
        let result = svc.handle("fx/data/7/temperature", b"1").await;

        assert!(matches!(
            result,
            Err(IngestError::Decode(DecodeError::MalformedTopic { .. }))
        ));
        assert!(svc.store().is_empty());
        assert_eq!(svc.stats().rejected(), 1);
    }

    #[tokio::test]
    async fn should_report_invalid_reading_for_empty_segment() {
        let svc = service();
        let result = svc.handle("fx/data/7//temperature", b"1").await;

        assert!(matches!(
            result,
            Err(IngestError::InvalidReading(ValidationError::InvalidReading(
                ReadingField::SensorId
            )))
        ));
        assert!(svc.store().is_empty());
    }

    struct FailingStore;

    impl ReadingStore for FailingStore {
        async fn write(&self, _reading: Reading) -> Result<(), FarmHubError> {
            Err(FarmHubError::Storage("disk full".into()))
        }

        fn latest_for_farm(
            &self,
            _farm_id: &str,
        ) -> impl Future<Output = Result<LatestSnapshot, FarmHubError>> + Send {
            async { Ok(LatestSnapshot::new()) }
        }

        fn latest(
            &self,
            _sensor_id: &str,
            _metric_type: &str,
        ) -> impl Future<Output = Result<Option<Reading>, FarmHubError>> + Send {
            async { Ok(None) }
        }

        fn range_for_farm(
            &self,
            _farm_id: &str,
            _metric_type: &str,
            _range: TimeRange,
        ) -> impl Future<Output = Result<Vec<Reading>, FarmHubError>> + Send {
            async { Ok(Vec::new()) }
        }

        async fn purge_before(&self, _before: Timestamp) -> Result<u64, FarmHubError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn should_surface_store_failure() {
        let svc = IngestService::new(TelemetryDecoder::new("fx"), FailingStore);
        let result = svc.handle("fx/data/7/s/temperature", b"1").await;

        assert!(matches!(result, Err(IngestError::Store(FarmHubError::Storage(_)))));
        assert_eq!(svc.stats().rejected(), 1);
    }
}
