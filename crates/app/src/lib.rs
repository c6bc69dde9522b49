//! # farmhub-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ReadingStore`: append & query the telemetry time-series
//!   - `RuleRepository`: list the enabled rules
//!   - `FarmDirectory`: look up farms and their devices
//!   - `CommandPublisher`: publish a command message on the broker
//!   - `NotificationSink`: deliver a notification to a user channel
//! - Define **driving/inbound** use-cases:
//!   - `IngestService`: decode and store one inbound telemetry message
//!   - `ControlLoop`: evaluate every enabled rule against the latest readings
//!   - `Scheduler`: drive the control loop on a timer, one cycle at a time
//!   - `ActuationDispatcher` / `NotificationFanout`: the side effects of a fired rule
//! - Provide **in-process infrastructure** that doesn't need IO
//!   (`InMemoryReadingStore`, `InProcessNotificationBus`)
//!
//! ## Dependency rule
//! Depends on `farmhub-domain` only (plus `tokio` for tasks, channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod control_loop;
pub mod dispatcher;
pub mod ingest;
pub mod notification_bus;
pub mod notifier;
pub mod ports;
pub mod scheduler;
pub mod timeseries;
