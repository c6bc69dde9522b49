//! Commands and actuation intents sent to actuators over the broker.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;
use crate::rule::{ActionType, Rule};

/// Topic segment for outbound device commands.
pub const CONTROL_SEGMENT: &str = "control";

/// Build `<namespace>/control/<device_identifier>`.
#[must_use]
pub fn control_topic(namespace: &str, device_identifier: &str) -> String {
    format!("{namespace}/{CONTROL_SEGMENT}/{device_identifier}")
}

/// A command payload: the action plus an optional duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "command")]
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl Command {
    #[must_use]
    pub const fn new(action: ActionType) -> Self {
        Self {
            action,
            duration_minutes: None,
        }
    }

    /// The command a rule issues when it fires.
    #[must_use]
    pub const fn for_rule(rule: &Rule) -> Self {
        Self {
            action: rule.action,
            duration_minutes: rule.action_duration_minutes,
        }
    }

    /// Encode as the JSON payload published on the control topic,
    /// e.g. `{"command":"TURN_ON"}`.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the command cannot be encoded.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<ActionType> for Command {
    fn from(action: ActionType) -> Self {
        Self::new(action)
    }
}

/// A pending command for one actuator, produced by one rule evaluation and
/// consumed immediately by the dispatcher. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationIntent {
    pub actuator_device_id: Option<DeviceId>,
    pub command: Command,
    pub topic: String,
}

impl ActuationIntent {
    /// An intent addressed by device identifier only (manual control).
    #[must_use]
    pub fn new(namespace: &str, device_identifier: &str, command: Command) -> Self {
        Self {
            actuator_device_id: None,
            command,
            topic: control_topic(namespace, device_identifier),
        }
    }

    /// The intent a fired rule produces for its resolved actuator.
    #[must_use]
    pub fn for_rule(namespace: &str, rule: &Rule, actuator_identifier: &str) -> Self {
        Self {
            actuator_device_id: Some(rule.actuator_device_id),
            command: Command::for_rule(rule),
            topic: control_topic(namespace, actuator_identifier),
        }
    }
}
