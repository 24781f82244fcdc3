//! Error types for the engine.

use fieldsync_protocol::{ErrorCategory, ErrorRecord, Operation};
use fieldsync_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// A failure affecting a single pushed item.
///
/// Item errors are recorded in the response and never abort the batch;
/// the remaining items keep processing.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The change record is malformed.
    #[error("invalid change: {message}")]
    Validation {
        /// What is wrong with the record.
        message: String,
    },

    /// Update/Delete referenced a row the server does not have.
    #[error("entity {entity_id} not found")]
    NotFound {
        /// The missing entity.
        entity_id: Uuid,
    },

    /// The store failed while applying this item.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ItemError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns the response-level category for this failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ItemError::Validation { .. } => ErrorCategory::Validation,
            ItemError::NotFound { .. } => ErrorCategory::NotFound,
            ItemError::Storage(_) => ErrorCategory::Storage,
        }
    }

    /// Maps this failure into the response's error record shape.
    pub fn into_record(
        self,
        kind: fieldsync_protocol::EntityKind,
        entity_id: Uuid,
        operation: Operation,
    ) -> ErrorRecord {
        let category = self.category();
        ErrorRecord {
            category,
            kind: Some(kind),
            entity_id: Some(entity_id),
            operation: Some(operation),
            message: self.to_string(),
            details: None,
        }
    }
}
