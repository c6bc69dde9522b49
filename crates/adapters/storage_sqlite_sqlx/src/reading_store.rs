//! `SQLite` implementation of [`ReadingStore`].

use chrono::Duration;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use farmhub_app::ports::ReadingStore;
use farmhub_domain::error::FarmHubError;
use farmhub_domain::reading::{LatestSnapshot, Reading, TimeRange};
use farmhub_domain::time::{Timestamp, from_micros, now, saturating_sub, to_micros};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct Wrapper(Reading);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let recorded_at: i64 = row.try_get("recorded_at")?;
        let timestamp = from_micros(recorded_at).ok_or_else(|| {
            sqlx::Error::Decode(Box::new(StorageError::InvalidTimestamp(recorded_at)))
        })?;

        Ok(Self(Reading {
            farm_id: row.try_get("farm_id")?,
            sensor_id: row.try_get("sensor_id")?,
            metric_type: row.try_get("metric_type")?,
            value: row.try_get("value")?,
            timestamp,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO readings (farm_id, sensor_id, metric_type, value, recorded_at)
    VALUES (?, ?, ?, ?, ?)
";

// Ties on recorded_at are broken by insertion order.
const SELECT_LATEST_FOR_FARM: &str = r"
    SELECT farm_id, sensor_id, metric_type, value, recorded_at FROM (
        SELECT *, ROW_NUMBER() OVER (
            PARTITION BY sensor_id, metric_type
            ORDER BY recorded_at DESC, id DESC
        ) AS rn
        FROM readings
        WHERE farm_id = ? AND recorded_at >= ?
    )
    WHERE rn = 1
";

const SELECT_LATEST: &str = r"
    SELECT farm_id, sensor_id, metric_type, value, recorded_at FROM readings
    WHERE sensor_id = ? AND metric_type = ? AND recorded_at >= ?
    ORDER BY recorded_at DESC, id DESC
    LIMIT 1
";

const SELECT_RANGE: &str = r"
    SELECT farm_id, sensor_id, metric_type, value, recorded_at FROM readings
    WHERE farm_id = ? AND metric_type = ? AND recorded_at >= ? AND recorded_at <= ?
    ORDER BY recorded_at ASC, id ASC
";

const DELETE_BEFORE: &str = "DELETE FROM readings WHERE recorded_at < ?";

/// `SQLite`-backed telemetry time-series.
pub struct SqliteReadingStore {
    pool: SqlitePool,
    recency_window: Duration,
}

impl SqliteReadingStore {
    /// Create a store using the given pool whose "latest" queries look back
    /// `recency_window`.
    #[must_use]
    pub fn new(pool: SqlitePool, recency_window: Duration) -> Self {
        Self {
            pool,
            recency_window,
        }
    }

    fn recent_since(&self) -> i64 {
        to_micros(saturating_sub(now(), self.recency_window))
    }
}

impl ReadingStore for SqliteReadingStore {
    async fn write(&self, reading: Reading) -> Result<(), FarmHubError> {
        reading.validate()?;

        sqlx::query(INSERT)
            .bind(&reading.farm_id)
            .bind(&reading.sensor_id)
            .bind(&reading.metric_type)
            .bind(reading.value)
            .bind(to_micros(reading.timestamp))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn latest_for_farm(&self, farm_id: &str) -> Result<LatestSnapshot, FarmHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_LATEST_FOR_FARM)
            .bind(farm_id)
            .bind(self.recent_since())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn latest(
        &self,
        sensor_id: &str,
        metric_type: &str,
    ) -> Result<Option<Reading>, FarmHubError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_LATEST)
            .bind(sensor_id)
            .bind(metric_type)
            .bind(self.recent_since())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }

    async fn range_for_farm(
        &self,
        farm_id: &str,
        metric_type: &str,
        range: TimeRange,
    ) -> Result<Vec<Reading>, FarmHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RANGE)
            .bind(farm_id)
            .bind(metric_type)
            .bind(to_micros(range.from))
            .bind(to_micros(range.to))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn purge_before(&self, before: Timestamp) -> Result<u64, FarmHubError> {
        let result = sqlx::query(DELETE_BEFORE)
            .bind(to_micros(before))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}
