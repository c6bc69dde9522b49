//! Notification: a human-readable event for a farm owner.

use serde::Serialize;

use crate::actuation::Command;
use crate::farm::Device;
use crate::id::{NotificationId, UserId};
use crate::rule::Rule;
use crate::time::Timestamp;

/// Prefix of every per-user notification channel.
pub const CHANNEL_PREFIX: &str = "notifications";

/// Channel name for `user_id`: `notifications/{user_id}`.
#[must_use]
pub fn channel_for(user_id: UserId) -> String {
    format!("{CHANNEL_PREFIX}/{user_id}")
}

/// An ephemeral notification, consumed immediately by the fanout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub timestamp: Timestamp,
}

/// Wire body delivered on a notification channel.
#[derive(Debug, Serialize)]
pub struct NotificationPayload<'a> {
    pub message: &'a str,
    pub timestamp: Timestamp,
}

impl NotificationEvent {
    #[must_use]
    pub fn new(user_id: UserId, message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            message: message.into(),
            timestamp,
        }
    }

    /// The per-user channel this event is published on.
    #[must_use]
    pub fn channel(&self) -> String {
        channel_for(self.user_id)
    }

    /// The `{message, timestamp}` body.
    #[must_use]
    pub fn payload(&self) -> NotificationPayload<'_> {
        NotificationPayload {
            message: &self.message,
            timestamp: self.timestamp,
        }
    }
}

/// Message sent to the owner when `rule` fires against `actuator`.
#[must_use]
pub fn rule_fired_message(rule: &Rule, actuator: &Device, command: &Command) -> String {
    format!(
        "Rule '{}' triggered: Device '{}' was commanded to '{}'.",
        rule.name, actuator.name, command.action
    )
}
