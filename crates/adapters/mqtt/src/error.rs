//! MQTT adapter error types.

use farmhub_domain::error::FarmHubError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client rejected a request (its event loop is gone or its
    /// channel is full).
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// Failed to encode an outbound payload.
    #[error("failed to encode MQTT payload")]
    Encode(#[source] serde_json::Error),
}

impl MqttError {
    /// Convert into a [`FarmHubError::Broker`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> FarmHubError {
        FarmHubError::Broker(Box::new(self))
    }
}

impl From<MqttError> for FarmHubError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_to_broker_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad").unwrap_err();
        let err: FarmHubError = MqttError::Encode(json_err).into();
        assert!(matches!(err, FarmHubError::Broker(_)));
    }

    #[test]
    fn should_display_encode_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad").unwrap_err();
        let err = MqttError::Encode(json_err);
        assert_eq!(err.to_string(), "failed to encode MQTT payload");
    }
}
