//! Notification fanout: best-effort delivery of user-facing events.

use std::time::Duration;

use farmhub_domain::error::FarmHubError;
use farmhub_domain::id::UserId;
use farmhub_domain::notification::NotificationEvent;
use farmhub_domain::time::now;

use crate::ports::NotificationSink;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("notification sink failed")]
    Sink(#[source] FarmHubError),

    #[error("notification delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Publishes a message on the recipient's `notifications/{user_id}` channel.
///
/// At-most-once: nothing is retried, and callers log failures rather than
/// letting them fail the rule evaluation that produced the message.
pub struct NotificationFanout<N> {
    sink: N,
    timeout: Duration,
}

impl<N: NotificationSink> NotificationFanout<N> {
    pub fn new(sink: N) -> Self {
        Self {
            sink,
            timeout: crate::dispatcher::DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stamp `message` with the current time and deliver it to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Sink`] when the sink fails or
    /// [`PublishError::Timeout`] when it does not answer in time.
    #[tracing::instrument(skip(self, message), fields(user_id = %user_id))]
    pub async fn notify(
        &self,
        user_id: UserId,
        message: impl Into<String>,
    ) -> Result<(), PublishError> {
        let event = NotificationEvent::new(user_id, message, now());
        let id = event.id;
        match tokio::time::timeout(self.timeout, self.sink.deliver(event)).await {
            Ok(Ok(())) => {
                tracing::debug!(notification_id = %id, "notification delivered");
                Ok(())
            }
            Ok(Err(err)) => Err(PublishError::Sink(err)),
            Err(_) => Err(PublishError::Timeout(self.timeout)),
        }
    }
}
