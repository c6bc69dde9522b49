//! Broker port: outbound command messages.

use std::future::Future;

use farmhub_domain::error::FarmHubError;

/// Publishes raw messages on the publish/subscribe broker.
///
/// Delivery is fire-and-forget at the broker's own QoS: returning `Ok` means
/// the message was handed to the broker client, not that a device received it.
pub trait CommandPublisher {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), FarmHubError>> + Send;
}

impl<T: CommandPublisher + Send + Sync> CommandPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), FarmHubError>> + Send {
        (**self).publish(topic, payload)
    }
}
