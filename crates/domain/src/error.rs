//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`TimerError`]
//! via `#[from]`. Storage adapters box their error into
//! [`TimerError::Storage`] so the domain stays free of IO crates.

/// Top-level error returned by services and repository ports.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The targeted row does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The operation was aborted through its cancellation token.
    ///
    /// This is a normal outcome, not a failure: nothing was read or written.
    #[error("operation cancelled")]
    Cancelled,

    /// The persistence layer failed.
    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

impl TimerError {
    /// Whether this error is a cooperative cancellation rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Violations of [`TimerConfig`](crate::timer::TimerConfig) invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The name is empty or whitespace only.
    #[error("name must not be blank")]
    BlankName,

    /// A numeric field lies outside its accepted range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

/// A lookup or update targeted a row that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A stored tag does not name any known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownVariantError {
    pub kind: &'static str,
    pub value: String,
}
