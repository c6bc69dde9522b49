//! Reading: one timestamped sensor measurement, plus the query shapes used
//! to read the time-series back.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{ReadingField, ValidationError};
use crate::time::{Timestamp, saturating_sub};

/// A single point of a `(farm_id, sensor_id, metric_type)` series.
///
/// Readings are immutable once written. They carry no identity of their own;
/// ordering inside a series is by `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub farm_id: String,
    pub sensor_id: String,
    pub metric_type: String,
    pub value: f64,
    pub timestamp: Timestamp,
}

impl Reading {
    #[must_use]
    pub fn new(
        farm_id: impl Into<String>,
        sensor_id: impl Into<String>,
        metric_type: impl Into<String>,
        value: f64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            farm_id: farm_id.into(),
            sensor_id: sensor_id.into(),
            metric_type: metric_type.into(),
            value,
            timestamp,
        }
    }

    /// Check that every series coordinate is present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidReading`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.farm_id.is_empty() {
            return Err(ValidationError::InvalidReading(ReadingField::FarmId));
        }
        if self.sensor_id.is_empty() {
            return Err(ValidationError::InvalidReading(ReadingField::SensorId));
        }
        if self.metric_type.is_empty() {
            return Err(ValidationError::InvalidReading(ReadingField::MetricType));
        }
        Ok(())
    }

    /// Key used to look this reading up in a [`LatestSnapshot`].
    #[must_use]
    pub fn snapshot_key(&self) -> String {
        snapshot_key(&self.sensor_id, &self.metric_type)
    }
}

/// Build the `sensor_id:metric_type` lookup key.
#[must_use]
pub fn snapshot_key(sensor_id: &str, metric_type: &str) -> String {
    format!("{sensor_id}:{metric_type}")
}

/// The most recent value of every recently-active series of one farm.
///
/// Produced once per farm per evaluation cycle so that every rule of that
/// farm is evaluated against the same point-in-time view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestSnapshot {
    values: HashMap<String, f64>,
}

impl LatestSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest value of a series.
    pub fn insert(&mut self, sensor_id: &str, metric_type: &str, value: f64) {
        self.values.insert(snapshot_key(sensor_id, metric_type), value);
    }

    /// Look up the latest value of a series.
    #[must_use]
    pub fn get(&self, sensor_id: &str, metric_type: &str) -> Option<f64> {
        self.values.get(&snapshot_key(sensor_id, metric_type)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<Reading> for LatestSnapshot {
    fn from_iter<I: IntoIterator<Item = Reading>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for reading in iter {
            snapshot.insert(&reading.sensor_id, &reading.metric_type, reading.value);
        }
        snapshot
    }
}

/// Inclusive time window `[from, to]` for historical queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl TimeRange {
    #[must_use]
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }

    /// The window of length `span` ending at `now`, clamped to the earliest
    /// representable timestamp.
    #[must_use]
    pub fn last(span: Duration, now: Timestamp) -> Self {
        Self {
            from: saturating_sub(now, span),
            to: now,
        }
    }

    #[must_use]
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.from && ts <= self.to
    }
}

/// A relative history window such as `"24h"`, `"-7d"` or `"30m"`.
///
/// The leading minus sign is optional; supported units are `m`, `h`, `d`
/// and `w`. Spans longer than [`HistoryRange::MAX_SPAN`] are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRange(Duration);

impl HistoryRange {
    pub const MAX_SPAN: Duration = Duration::weeks(52 * 100);

    #[must_use]
    pub fn span(self) -> Duration {
        self.0
    }

    /// Resolve into an absolute window ending at `now`.
    #[must_use]
    pub fn resolve(self, now: Timestamp) -> TimeRange {
        TimeRange::last(self.0, now)
    }
}

impl FromStr for HistoryRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidRange(s.to_string());
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
        if body.len() < 2 {
            return Err(invalid());
        }
        let (amount, unit) = body.split_at(body.len() - 1);
        let amount: i64 = amount.parse().map_err(|_| invalid())?;
        if amount <= 0 {
            return Err(invalid());
        }
        let span = match unit {
            "m" => Duration::try_minutes(amount),
            "h" => Duration::try_hours(amount),
            "d" => Duration::try_days(amount),
            "w" => Duration::try_weeks(amount),
            _ => None,
        }
        .filter(|span| *span <= Self::MAX_SPAN)
        .ok_or_else(invalid)?;
        Ok(Self(span))
    }
}
