//! Inbound side: the rumqttc event loop feeding the ingest service.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, Outgoing, QoS};
use tokio::sync::watch;

use farmhub_app::ingest::IngestService;
use farmhub_app::ports::ReadingStore;
use farmhub_domain::telemetry::data_filter;

/// Pause before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on flushing the disconnect packet at shutdown.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// What the loop should do with one event-loop notification.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Inbound {
    /// (Re)connected: the subscription must be (re)issued.
    Connected,
    Message { topic: String, payload: Vec<u8> },
    Ignored,
}

impl From<Event> for Inbound {
    fn from(event: Event) -> Self {
        match event {
            Event::Incoming(Incoming::ConnAck(_)) => Self::Connected,
            Event::Incoming(Incoming::Publish(publish)) => Self::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            },
            _ => Self::Ignored,
        }
    }
}

/// Owns the rumqttc event loop. Must be polled for anything, inbound or
/// outbound, to reach the broker.
pub struct MqttConnection {
    client: AsyncClient,
    eventloop: EventLoop,
    namespace: String,
}

impl MqttConnection {
    #[must_use]
    pub fn new(client: AsyncClient, eventloop: EventLoop, namespace: String) -> Self {
        Self {
            client,
            eventloop,
            namespace,
        }
    }

    /// Poll the broker until `shutdown` flips to `true`.
    ///
    /// Every inbound message is handed to `service` on its own task, so a slow
    /// store write never stalls the connection. Connection errors are logged
    /// and retried; they never end the loop.
    pub async fn run<S>(
        mut self,
        service: Arc<IngestService<S>>,
        mut shutdown: watch::Receiver<bool>,
    ) where
        S: ReadingStore + Send + Sync + 'static,
    {
        let filter = data_filter(&self.namespace);
        tracing::info!(%filter, "mqtt ingest loop started");

        loop {
            tokio::select! {
                event = self.eventloop.poll() => match event {
                    Ok(event) => self.on_event(event, &filter, &service),
                    Err(err) => {
                        tracing::warn!(error = %err, "mqtt connection error, retrying");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.disconnect().await;
        tracing::info!(
            accepted = service.stats().accepted(),
            rejected = service.stats().rejected(),
            "mqtt ingest loop stopped"
        );
    }

    fn on_event<S>(&self, event: Event, filter: &str, service: &Arc<IngestService<S>>)
    where
        S: ReadingStore + Send + Sync + 'static,
    {
        match Inbound::from(event) {
            Inbound::Connected => {
                tracing::info!("connected to mqtt broker");
                if let Err(err) = self.client.try_subscribe(filter, QoS::AtLeastOnce) {
                    tracing::error!(error = %err, "failed to subscribe to telemetry topics");
                }
            }
            Inbound::Message { topic, payload } => {
                let service = Arc::clone(service);
                tokio::spawn(async move {
                    // failures are logged and counted by the service
                    let _ = service.handle(&topic, &payload).await;
                });
            }
            Inbound::Ignored => {}
        }
    }

    async fn disconnect(&mut self) {
        if let Err(err) = self.client.try_disconnect() {
            tracing::debug!(error = %err, "mqtt disconnect request failed");
            return;
        }
        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await.is_err() {
            tracing::debug!("mqtt disconnect not flushed in time");
        }
    }
}

#[cfg(test)]
mod tests {
    use rumqttc::{ConnAck, ConnectReturnCode, Publish};

    use super::*;

    #[test]
    fn should_map_connack_to_connected() {
        let connack = ConnAck::new(ConnectReturnCode::Success, false);
        let event = Event::Incoming(Incoming::ConnAck(connack));
        assert_eq!(Inbound::from(event), Inbound::Connected);
    }

    #[test]
    fn should_map_publish_to_message() {
        let publish = Publish::new(
            "fx/data/7/pump-sensor-1/temperature",
            QoS::AtLeastOnce,
            r#"{"value":42.5}"#,
        );
        let inbound = Inbound::from(Event::Incoming(Incoming::Publish(publish)));
        assert_eq!(
            inbound,
            Inbound::Message {
                topic: "fx/data/7/pump-sensor-1/temperature".to_string(),
                payload: br#"{"value":42.5}"#.to_vec(),
            }
        );
    }

    #[test]
    fn should_ignore_other_packets() {
        assert_eq!(Inbound::from(Event::Incoming(Incoming::PingResp)), Inbound::Ignored);
        assert_eq!(Inbound::from(Event::Outgoing(Outgoing::PingReq)), Inbound::Ignored);
    }
}
