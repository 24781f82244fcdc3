//! Error types for the store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A staged write violated a row invariant.
    #[error("constraint violation: {message}")]
    Constraint {
        /// Description of the violated invariant.
        message: String,
    },

    /// The backend could not serve the operation.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the outage.
        message: String,
    },

    /// The commit failed; none of the session's writes were published.
    #[error("commit failed: {message}")]
    CommitFailed {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a constraint violation error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a commit failure error.
    pub fn commit_failed(message: impl Into<String>) -> Self {
        Self::CommitFailed {
            message: message.into(),
        }
    }

    /// Returns true if the whole request should be retried later.
    ///
    /// Item-level constraint violations are recorded and skipped; outages
    /// and failed commits mean nothing was made durable.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable { .. } | StoreError::CommitFailed { .. }
        )
    }
}
