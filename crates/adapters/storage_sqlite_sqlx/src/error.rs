//! Storage-specific error type wrapping sqlx errors.

use farmhub_domain::error::FarmHubError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored timestamp is outside the representable range.
    #[error("invalid stored timestamp {0}")]
    InvalidTimestamp(i64),
}

impl From<StorageError> for FarmHubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
