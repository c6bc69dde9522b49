//! Telemetry decoder: turns an inbound broker message into a [`Reading`].
//!
//! Topics follow `<namespace>/data/<farm_id>/<sensor_id>/<metric_type>`.
//! Payloads are either `{"value": <number>}` or a bare numeric literal.

use serde::Deserialize;

use crate::error::DecodeError;
use crate::reading::Reading;
use crate::time::{Timestamp, now};

/// Topic segment for inbound telemetry.
pub const DATA_SEGMENT: &str = "data";

/// Build the wildcard filter matching every telemetry topic of `namespace`.
#[must_use]
pub fn data_filter(namespace: &str) -> String {
    format!("{namespace}/{DATA_SEGMENT}/#")
}

#[derive(Debug, Deserialize)]
struct ValuePayload {
    value: NumberOrString,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Stateless decoder bound to one topic namespace.
#[derive(Debug, Clone)]
pub struct TelemetryDecoder {
    namespace: String,
}

impl TelemetryDecoder {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Decode a message, stamping it with the current arrival time.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MalformedTopic`] when the topic is not a
    /// telemetry topic of this namespace, or [`DecodeError::InvalidPayload`]
    /// when no finite number can be extracted from the payload.
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<Reading, DecodeError> {
        self.decode_at(topic, payload, now())
    }

    /// Same as [`TelemetryDecoder::decode`] with an explicit arrival time.
    ///
    /// # Errors
    ///
    /// See [`TelemetryDecoder::decode`].
    pub fn decode_at(
        &self,
        topic: &str,
        payload: &[u8],
        timestamp: Timestamp,
    ) -> Result<Reading, DecodeError> {
        let (farm_id, sensor_id, metric_type) =
            self.split_topic(topic).ok_or_else(|| DecodeError::MalformedTopic {
                topic: topic.to_string(),
            })?;
        let value = parse_value(payload).ok_or_else(|| DecodeError::InvalidPayload {
            topic: topic.to_string(),
        })?;
        Ok(Reading::new(farm_id, sensor_id, metric_type, value, timestamp))
    }

    fn split_topic<'t>(&self, topic: &'t str) -> Option<(&'t str, &'t str, &'t str)> {
        let mut parts = topic.split('/');
        let namespace = parts.next()?;
        let segment = parts.next()?;
        let farm_id = parts.next()?;
        let sensor_id = parts.next()?;
        let metric_type = parts.next()?;
        if parts.next().is_some() || namespace != self.namespace || segment != DATA_SEGMENT {
            return None;
        }
        Some((farm_id, sensor_id, metric_type))
    }
}

fn parse_value(payload: &[u8]) -> Option<f64> {
    let value = match serde_json::from_slice::<ValuePayload>(payload) {
        Ok(parsed) => parsed.value.as_f64(),
        Err(_) => std::str::from_utf8(payload).ok()?.trim().parse().ok(),
    }?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> TelemetryDecoder {
        TelemetryDecoder::new("fx")
    }

    #[test]
    fn should_decode_structured_payload_into_reading() {
        let reading = decoder()
            .decode("fx/data/7/pump-sensor-1/temperature", br#"{"value": 42.5}"#)
            .unwrap();
        assert_eq!(reading.farm_id, "7");
        assert_eq!(reading.sensor_id, "pump-sensor-1");
        assert_eq!(reading.metric_type, "temperature");
        assert!((reading.value - 42.5).abs() < f64::EPSILON);
    }

    #[test]
    fn should_fall_back_to_bare_numeric_payload() {
        let reading = decoder().decode("fx/data/1/s/humidity", b" 63 ").unwrap();
        assert!((reading.value - 63.0).abs() < f64::EPSILON);
    }

    #[test]
    fn should_accept_numeric_string_in_value_field() {
        let reading = decoder()
            .decode("fx/data/1/s/humidity", br#"{"value": "12.25"}"#)
            .unwrap();
        assert!((reading.value - 12.25).abs() < f64::EPSILON);
    }

    #[test]
    fn should_use_supplied_arrival_time() {
        let at = now() - chrono::Duration::minutes(3);
        let reading = decoder().decode_at("fx/data/1/s/m", b"1", at).unwrap();
        assert_eq!(reading.timestamp, at);
    }

    #[test]
    fn should_reject_topics_with_wrong_segment_count() {
        for topic in ["fx/data/7/s", "fx/data/7/s/m/extra", "fx", ""] {
            assert_eq!(
                decoder().decode(topic, b"1"),
                Err(DecodeError::MalformedTopic {
                    topic: topic.to_string()
                }),
                "topic {topic:?}"
            );
        }
    }

    #[test]
    fn should_reject_topics_with_wrong_literals() {
        for topic in ["other/data/7/s/m", "fx/control/7/s/m"] {
            assert!(matches!(
                decoder().decode(topic, b"1"),
                Err(DecodeError::MalformedTopic { .. })
            ));
        }
    }

    #[test]
    fn should_reject_unparseable_payload() {
        for payload in [&b"warm"[..], br#"{"temp": 3}"#, br#"{"value": null}"#, b""] {
            assert!(matches!(
                decoder().decode("fx/data/7/s/m", payload),
                Err(DecodeError::InvalidPayload { .. })
            ));
        }
    }

    #[test]
    fn should_reject_non_finite_values() {
        for payload in [&b"NaN"[..], b"inf", br#"{"value": "-inf"}"#] {
            assert!(matches!(
                decoder().decode("fx/data/7/s/m", payload),
                Err(DecodeError::InvalidPayload { .. })
            ));
        }
    }

    #[test]
    fn should_build_data_filter() {
        assert_eq!(data_filter("smartfarm"), "smartfarm/data/#");
    }
}
