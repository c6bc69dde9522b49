//! Outbound side: commands and notifications published through rumqttc.

use rumqttc::{AsyncClient, QoS};

use farmhub_app::ports::{CommandPublisher, NotificationSink};
use farmhub_domain::error::FarmHubError;
use farmhub_domain::notification::NotificationEvent;

use crate::error::MqttError;

/// Topic carrying `event` under `namespace`: `<namespace>/notifications/<user_id>`.
#[must_use]
pub fn notification_topic(namespace: &str, event: &NotificationEvent) -> String {
    format!("{namespace}/{}", event.channel())
}

/// Cloneable handle publishing on the broker.
#[derive(Clone)]
pub struct MqttBroker {
    client: AsyncClient,
    namespace: String,
}

impl MqttBroker {
    #[must_use]
    pub fn new(client: AsyncClient, namespace: String) -> Self {
        Self { client, namespace }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl CommandPublisher for MqttBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), FarmHubError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(MqttError::Client)?;
        Ok(())
    }
}

impl NotificationSink for MqttBroker {
    async fn deliver(&self, event: NotificationEvent) -> Result<(), FarmHubError> {
        let payload = serde_json::to_vec(&event.payload()).map_err(MqttError::Encode)?;
        let topic = notification_topic(&self.namespace, &event);
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(MqttError::Client)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use farmhub_domain::id::UserId;
    use farmhub_domain::time::now;

    use super::*;

    #[test]
    fn should_prefix_notification_channel_with_namespace() {
        let event = NotificationEvent::new(UserId::new(3), "hi", now());
        assert_eq!(notification_topic("smartfarm", &event), "smartfarm/notifications/3");
    }

    #[test]
    fn should_encode_notification_body() {
        let event = NotificationEvent::new(UserId::new(3), "pump on", now());
        let body: serde_json::Value =
            serde_json::from_slice(&serde_json::to_vec(&event.payload()).unwrap()).unwrap();
        assert_eq!(body["message"], "pump on");
        assert!(body["timestamp"].is_string());
    }
}
