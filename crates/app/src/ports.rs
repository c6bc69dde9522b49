//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod broker;
pub mod directory;
pub mod notification_sink;
pub mod reading_store;
pub mod rule_repo;

pub use broker::CommandPublisher;
pub use directory::FarmDirectory;
pub use notification_sink::NotificationSink;
pub use reading_store::ReadingStore;
pub use rule_repo::RuleRepository;
