//! # farmhub-domain
//!
//! Pure domain model for the farmhub telemetry and control pipeline.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Readings** (one timestamped sensor measurement) and time ranges
//! - Define **Rules** (single-metric threshold → actuator command)
//! - Define **Farms** and **Devices** as seen through the metadata lookup service
//! - Define **Commands** and **Actuation intents** sent to actuators
//! - Define **Notification events** fanned out to farm owners
//! - Decode inbound telemetry messages (topic + payload) into readings
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod actuation;
pub mod farm;
pub mod notification;
pub mod reading;
pub mod rule;
pub mod telemetry;
