//! Farm and device metadata as returned by the lookup service.
//!
//! The core never creates or mutates these records; it only reads them to
//! resolve rule references and to find who owns a farm.

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, FarmId, UserId};

/// A farm and its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Farm {
    pub id: FarmId,
    pub name: String,
    pub owner_id: UserId,
}

/// A sensor or actuator registered to a farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub farm_id: FarmId,
    pub name: String,
    /// Free-form device kind, e.g. `"PUMP"`, `"FAN"`, `"SENSOR_TEMPERATURE"`.
    pub kind: String,
    /// Identifier used in broker topics, e.g. `"pump-01"`.
    pub identifier: String,
}

impl Device {
    /// Whether this device is registered to `farm_id`.
    #[must_use]
    pub fn belongs_to(&self, farm_id: FarmId) -> bool {
        self.farm_id == farm_id
    }
}
