//! Notification sink port.

use std::future::Future;

use farmhub_domain::error::FarmHubError;
use farmhub_domain::notification::NotificationEvent;

/// Delivers notification events to the per-user channel of their recipient.
pub trait NotificationSink {
    /// Deliver an event. At-most-once: a delivery with no listener succeeds.
    fn deliver(
        &self,
        event: NotificationEvent,
    ) -> impl Future<Output = Result<(), FarmHubError>> + Send;
}

impl<T: NotificationSink + Send + Sync> NotificationSink for std::sync::Arc<T> {
    fn deliver(
        &self,
        event: NotificationEvent,
    ) -> impl Future<Output = Result<(), FarmHubError>> + Send {
        (**self).deliver(event)
    }
}
