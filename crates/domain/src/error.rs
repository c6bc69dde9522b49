//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`FarmHubError`]
//! via `#[from]` (or an explicit `From` impl for boxed adapter errors).

/// Base error shared by every port boundary.
#[derive(Debug, thiserror::Error)]
pub enum FarmHubError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A persistence backend failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The publish/subscribe broker (or another outbound sink) failed.
    #[error("broker error")]
    Broker(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Violations of domain invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A reading is missing one of its series coordinates.
    #[error("invalid reading: {0} must not be empty")]
    InvalidReading(ReadingField),

    /// A required field was not provided to a builder.
    #[error("missing required field {0}")]
    MissingField(&'static str),

    /// A rule has an empty name.
    #[error("name must not be empty")]
    EmptyName,

    /// A rule has an empty condition metric.
    #[error("condition metric must not be empty")]
    EmptyMetric,

    /// A comparison operator symbol is not one of `<`, `>`, `<=`, `>=`, `=`.
    #[error("unknown comparison operator {0:?}")]
    UnknownOperator(String),

    /// An action type is not supported.
    #[error("unknown action type {0:?}")]
    UnknownAction(String),

    /// A relative history range could not be parsed.
    #[error("invalid time range {0:?}")]
    InvalidRange(String),
}

/// The reading coordinate that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingField {
    FarmId,
    SensorId,
    MetricType,
}

impl std::fmt::Display for ReadingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FarmId => "farm_id",
            Self::SensorId => "sensor_id",
            Self::MetricType => "metric_type",
        })
    }
}

/// Why an inbound telemetry message was rejected by the decoder.
///
/// Decoding happens before any port is involved, so this error stays out of
/// [`FarmHubError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The topic does not match `<namespace>/data/<farm>/<sensor>/<metric>`.
    #[error("malformed topic {topic:?}")]
    MalformedTopic { topic: String },

    /// The payload is neither `{"value": <number>}` nor a bare number.
    #[error("invalid payload on topic {topic:?}")]
    InvalidPayload { topic: String },
}
