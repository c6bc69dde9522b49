//! MQTT connection configuration.

use std::time::Duration;

use rumqttc::MqttOptions;
use serde::Deserialize;

/// Configuration for the MQTT broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// First topic segment of every farmhub topic.
    pub namespace: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Capacity of the request channel between the client and the event loop.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "farmhub".to_string(),
            namespace: "smartfarm".to_string(),
            keep_alive_secs: 30,
            channel_capacity: 64,
        }
    }
}

impl MqttConfig {
    /// Client options for rumqttc.
    #[must_use]
    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.broker_host, self.broker_port);
        options.set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs)));
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "farmhub");
        assert_eq!(config.namespace, "smartfarm");
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            broker_host = "mqtt.example.com"
            broker_port = 8883
            client_id = "farm-edge"
            namespace = "fx"
            keep_alive_secs = 60
            channel_capacity = 128
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "mqtt.example.com");
        assert_eq!(config.broker_port, 8883);
        assert_eq!(config.client_id, "farm-edge");
        assert_eq!(config.namespace, "fx");
        assert_eq!(config.keep_alive_secs, 60);
        assert_eq!(config.channel_capacity, 128);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let toml = r#"broker_host = "192.168.1.100""#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "192.168.1.100");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.namespace, "smartfarm");
    }

    #[test]
    fn should_build_client_options() {
        let config = MqttConfig {
            broker_host: "broker".to_string(),
            broker_port: 1884,
            ..MqttConfig::default()
        };
        let options = config.options();
        assert_eq!(options.broker_address(), ("broker".to_string(), 1884));
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }
}
