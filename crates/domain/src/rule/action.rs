//! Action: what an actuator is told to do when a rule fires.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The closed set of actuator commands a rule (or a manual control request)
/// may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    TurnOn,
    TurnOff,
}

impl ActionType {
    /// Wire representation used in command payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TurnOn => "TURN_ON",
            Self::TurnOff => "TURN_OFF",
        }
    }
}

impl FromStr for ActionType {
    type Err = ValidationError;

    /// Parse case-insensitively, so `turn_on` and `TURN_ON` are equivalent.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TURN_ON" => Ok(Self::TurnOn),
            "TURN_OFF" => Ok(Self::TurnOff),
            _ => Err(ValidationError::UnknownAction(s.to_string())),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
