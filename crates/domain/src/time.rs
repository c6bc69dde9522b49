//! Time and timestamp helpers.

use chrono::{DateTime, Duration, Utc};

/// UTC timestamp used for reading arrival times, notification times, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert a timestamp to microseconds since the Unix epoch.
#[must_use]
pub fn to_micros(ts: Timestamp) -> i64 {
    ts.timestamp_micros()
}

/// Convert microseconds since the Unix epoch back to a timestamp.
///
/// Returns `None` when the value is outside chrono's representable range.
#[must_use]
pub fn from_micros(micros: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_micros(micros)
}

/// `ts - span`, clamped to the earliest representable timestamp.
#[must_use]
pub fn saturating_sub(ts: Timestamp, span: Duration) -> Timestamp {
    ts.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
