//! In-process notification bus with one broadcast channel per user.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

use farmhub_domain::error::FarmHubError;
use farmhub_domain::id::UserId;
use farmhub_domain::notification::NotificationEvent;

use crate::ports::NotificationSink;

/// Per-user notification channels backed by tokio [`broadcast`] channels.
///
/// Delivering to a user nobody listens to succeeds and the event is dropped.
pub struct InProcessNotificationBus {
    capacity: usize,
    channels: Mutex<HashMap<UserId, broadcast::Sender<NotificationEvent>>>,
}

impl InProcessNotificationBus {
    /// Create a bus whose per-user channels hold `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to the `notifications/{user_id}` channel.
    ///
    /// Returns a receiver that will get all events delivered *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self, user_id: UserId) -> broadcast::Receiver<NotificationEvent> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    fn send(&self, event: NotificationEvent) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = channels.get(&event.user_id) else {
            return;
        };
        let user_id = event.user_id;
        if sender.send(event).is_err() {
            // every receiver of this user is gone
            channels.remove(&user_id);
        }
    }
}

impl NotificationSink for InProcessNotificationBus {
    fn deliver(
        &self,
        event: NotificationEvent,
    ) -> impl Future<Output = Result<(), FarmHubError>> + Send {
        self.send(event);
        async { Ok(()) }
    }
}
