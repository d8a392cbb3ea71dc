//! Storage-specific error type wrapping sqlx errors.

use workout_timer_domain::error::TimerError;

use crate::schema::SchemaMismatch;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// The live table does not have the expected column set.
    #[error(transparent)]
    SchemaMismatch(#[from] Box<SchemaMismatch>),

    /// The stored schema identity differs although the version matches.
    #[error(
        "schema identity mismatch (expected {expected}, found {found}): the schema changed without a version bump"
    )]
    IdentityMismatch { expected: String, found: String },

    /// No forward migration path leads from the stored version to the current one.
    #[error("no migration path from schema version {from} to {to}")]
    MigrationMissing { from: i64, to: i64 },
}

impl From<StorageError> for TimerError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// A stored `createdAt` value cannot be represented as a timestamp.
#[derive(Debug, thiserror::Error)]
#[error("createdAt {0} is out of range")]
pub struct TimestampOutOfRange(pub i64);
