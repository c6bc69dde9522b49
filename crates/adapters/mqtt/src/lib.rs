//! # farmhub-adapter-mqtt
//!
//! MQTT adapter: bridges field devices and the farmhub core over a broker.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker ([`connect`])
//! - Subscribe to `<namespace>/data/#` and feed every message to the
//!   `IngestService` ([`MqttConnection::run`])
//! - Publish actuator commands on `<namespace>/control/<device>` and
//!   notifications on `<namespace>/notifications/<user>` ([`MqttBroker`])
//!
//! ## Dependency rule
//! Same as other adapters: depends on `farmhub-app` and `farmhub-domain`.

pub mod broker;
pub mod config;
pub mod connection;
pub mod error;

pub use broker::MqttBroker;
pub use config::MqttConfig;
pub use connection::MqttConnection;
pub use error::MqttError;

/// Create the broker client pair for `config`.
///
/// Nothing touches the network until [`MqttConnection::run`] starts polling;
/// commands published before that are buffered in the client channel.
#[must_use]
pub fn connect(config: &MqttConfig) -> (MqttBroker, MqttConnection) {
    let (client, eventloop) = rumqttc::AsyncClient::new(config.options(), config.channel_capacity);
    let broker = MqttBroker::new(client.clone(), config.namespace.clone());
    let connection = MqttConnection::new(client, eventloop, config.namespace.clone());
    (broker, connection)
}
