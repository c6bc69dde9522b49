//! Rule: a threshold condition bound to one sensor and one actuator.
//!
//! Rules are owned by the metadata service and are read-only here. Each
//! evaluation cycle works on a freshly fetched snapshot of the enabled rules;
//! nothing is cached across cycles.

mod action;
mod condition;

pub use action::ActionType;
pub use condition::{Condition, Operator};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{DeviceId, FarmId, RuleId};

/// A single-metric threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub farm_id: FarmId,
    pub name: String,
    pub enabled: bool,
    pub condition: Condition,
    pub action: ActionType,
    /// How long the action should last, in minutes, if the actuator supports it.
    pub action_duration_minutes: Option<u32>,
    pub sensor_device_id: DeviceId,
    pub actuator_device_id: DeviceId,
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] or [`ValidationError::EmptyMetric`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.condition.metric.is_empty() {
            return Err(ValidationError::EmptyMetric);
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    id: Option<RuleId>,
    farm_id: Option<FarmId>,
    name: Option<String>,
    enabled: Option<bool>,
    condition: Option<Condition>,
    action: Option<ActionType>,
    action_duration_minutes: Option<u32>,
    sensor_device_id: Option<DeviceId>,
    actuator_device_id: Option<DeviceId>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<RuleId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn farm_id(mut self, farm_id: impl Into<FarmId>) -> Self {
        self.farm_id = Some(farm_id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn condition(
        mut self,
        metric: impl Into<String>,
        operator: Operator,
        threshold: f64,
    ) -> Self {
        self.condition = Some(Condition::new(metric, operator, threshold));
        self
    }

    #[must_use]
    pub fn action(mut self, action: ActionType) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn action_duration_minutes(mut self, minutes: u32) -> Self {
        self.action_duration_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn sensor_device_id(mut self, id: impl Into<DeviceId>) -> Self {
        self.sensor_device_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn actuator_device_id(mut self, id: impl Into<DeviceId>) -> Self {
        self.actuator_device_id = Some(id.into());
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when a required field was not
    /// set, or the errors of [`Rule::validate`].
    pub fn build(self) -> Result<Rule, ValidationError> {
        let rule = Rule {
            id: self.id.ok_or(ValidationError::MissingField("id"))?,
            farm_id: self.farm_id.ok_or(ValidationError::MissingField("farm_id"))?,
            name: self.name.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            condition: self
                .condition
                .ok_or(ValidationError::MissingField("condition"))?,
            action: self.action.ok_or(ValidationError::MissingField("action"))?,
            action_duration_minutes: self.action_duration_minutes,
            sensor_device_id: self
                .sensor_device_id
                .ok_or(ValidationError::MissingField("sensor_device_id"))?,
            actuator_device_id: self
                .actuator_device_id
                .ok_or(ValidationError::MissingField("actuator_device_id"))?,
        };
        rule.validate()?;
        Ok(rule)
    }
}
