//! Actuation dispatcher: turns commands into outbound broker messages.

use std::time::Duration;

use farmhub_domain::actuation::{ActuationIntent, Command, control_topic};
use farmhub_domain::error::{FarmHubError, ValidationError};
use farmhub_domain::rule::ActionType;

use crate::ports::CommandPublisher;

/// Default bound on a single publish.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid command")]
    InvalidCommand(#[from] ValidationError),

    #[error("failed to encode command")]
    Encode(#[from] serde_json::Error),

    #[error("broker rejected command for {topic}")]
    Broker {
        topic: String,
        #[source]
        source: FarmHubError,
    },

    #[error("publishing to {topic} timed out after {after:?}")]
    Timeout { topic: String, after: Duration },
}

/// Publishes commands on `<namespace>/control/<device_identifier>`.
///
/// Fire-and-forget: no device acknowledgement is awaited and failed sends are
/// not retried. The next evaluation cycle re-issues a command whose condition
/// still holds.
pub struct ActuationDispatcher<P> {
    publisher: P,
    namespace: String,
    timeout: Duration,
}

impl<P: CommandPublisher> ActuationDispatcher<P> {
    pub fn new(publisher: P, namespace: impl Into<String>) -> Self {
        Self {
            publisher,
            namespace: namespace.into(),
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Send a manually requested command such as `"turn_on"` to a device.
    ///
    /// The command is matched case-insensitively against the supported
    /// actions.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidCommand`] for unsupported commands,
    /// otherwise the errors of [`ActuationDispatcher::send`].
    pub async fn dispatch(
        &self,
        device_identifier: &str,
        command: &str,
    ) -> Result<(), DispatchError> {
        let action: ActionType = command.parse()?;
        self.send(device_identifier, Command::new(action)).await
    }

    /// Send a typed command to a device.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Broker`] when the publisher fails or
    /// [`DispatchError::Timeout`] when it does not answer in time.
    pub async fn send(
        &self,
        device_identifier: &str,
        command: Command,
    ) -> Result<(), DispatchError> {
        let topic = control_topic(&self.namespace, device_identifier);
        self.publish(topic, command).await
    }

    /// Send the command carried by a fired rule's intent.
    ///
    /// # Errors
    ///
    /// See [`ActuationDispatcher::send`].
    pub async fn dispatch_intent(&self, intent: &ActuationIntent) -> Result<(), DispatchError> {
        self.publish(intent.topic.clone(), intent.command).await
    }

    #[tracing::instrument(skip(self), fields(command = %command.action))]
    async fn publish(&self, topic: String, command: Command) -> Result<(), DispatchError> {
        let payload = command.to_payload()?;
        match tokio::time::timeout(self.timeout, self.publisher.publish(&topic, payload)).await {
            Ok(Ok(())) => {
                tracing::info!("command published");
                Ok(())
            }
            Ok(Err(source)) => Err(DispatchError::Broker { topic, source }),
            Err(_) => Err(DispatchError::Timeout {
                topic,
                after: self.timeout,
            }),
        }
    }
}
