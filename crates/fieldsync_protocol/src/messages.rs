//! Request and response messages for the sync endpoint.

use crate::change::{ChangeRecord, EntityChange, Operation};
use crate::conflict::Resolution;
use crate::entity::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A sync request from a field device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Cursor from the previous sync; absent means full sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    /// Kinds to pull; empty means every registered kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_kinds: Vec<EntityKind>,
    /// Client changes to push, grouped by kind.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub changes: BTreeMap<EntityKind, Vec<ChangeRecord>>,
}

impl SyncRequest {
    /// Creates a full-sync request with no pushed changes.
    pub fn full_sync() -> Self {
        Self::default()
    }

    /// Creates a request pulling changes newer than `cursor`.
    pub fn since(cursor: DateTime<Utc>) -> Self {
        Self {
            last_sync_timestamp: Some(cursor),
            ..Self::default()
        }
    }

    /// Restricts the pull phase to the given kinds.
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.entity_kinds = kinds.into_iter().collect();
        self
    }

    /// Adds a batch of changes for one kind.
    pub fn with_changes(
        mut self,
        kind: EntityKind,
        records: impl IntoIterator<Item = ChangeRecord>,
    ) -> Self {
        self.changes
            .entry(kind)
            .or_default()
            .extend(records);
        self
    }
}

/// One conflicted item from the push phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Kind of the conflicted entity.
    pub kind: EntityKind,
    /// Identity of the conflicted entity.
    pub entity_id: Uuid,
    /// The server timestamp the client claims it last saw, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_modified: Option<DateTime<Utc>>,
    /// When the server row was actually last written.
    pub server_modified: DateTime<Utc>,
    /// How the conflict was resolved.
    pub resolution: Resolution,
}

/// Classification of a recorded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The change record was malformed.
    Validation,
    /// Update/Delete referenced a row the server does not have.
    NotFound,
    /// The store failed while applying one item.
    Storage,
    /// A failure outside the per-item handlers (begin/commit).
    Sync,
}

/// One recorded error.
///
/// Item-level errors never abort the batch; a `Sync`-category entry means
/// the finalize step itself failed and the whole request must be retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// What went wrong, by class.
    pub category: ErrorCategory,
    /// Kind of the affected entity, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntityKind>,
    /// Identity of the affected entity, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<Uuid>,
    /// The operation that failed, when the error concerns one item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    /// Human-readable description.
    pub message: String,
    /// Extra diagnostic context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorRecord {
    /// Creates a validation error for one item or one batch.
    pub fn validation(
        kind: Option<EntityKind>,
        entity_id: Option<Uuid>,
        operation: Option<Operation>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category: ErrorCategory::Validation,
            kind,
            entity_id,
            operation,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a not-found error for one item.
    pub fn not_found(kind: EntityKind, entity_id: Uuid, operation: Operation) -> Self {
        Self {
            category: ErrorCategory::NotFound,
            kind: Some(kind),
            entity_id: Some(entity_id),
            operation: Some(operation),
            message: format!("{kind} {entity_id} not found"),
            details: None,
        }
    }

    /// Creates a storage error for one item.
    pub fn storage(
        kind: EntityKind,
        entity_id: Uuid,
        operation: Operation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category: ErrorCategory::Storage,
            kind: Some(kind),
            entity_id: Some(entity_id),
            operation: Some(operation),
            message: message.into(),
            details: None,
        }
    }

    /// Creates the top-level error reported when finalize/commit fails.
    pub fn sync(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Sync,
            kind: None,
            entity_id: None,
            operation: None,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches diagnostic detail.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Per-kind counters plus conflict/error totals for one sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Accepted pushed items per kind.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pushed: BTreeMap<EntityKind, u64>,
    /// Pulled items per kind.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pulled: BTreeMap<EntityKind, u64>,
    /// Total conflicts reported.
    pub conflicts: u64,
    /// Total errors recorded.
    pub errors: u64,
}

impl SyncSummary {
    /// Counts one accepted push for `kind`.
    pub fn record_pushed(&mut self, kind: EntityKind) {
        *self.pushed.entry(kind).or_default() += 1;
    }

    /// Counts `n` pulled items for `kind`.
    pub fn record_pulled(&mut self, kind: EntityKind, n: u64) {
        *self.pulled.entry(kind).or_default() += n;
    }

    /// Total accepted pushes across kinds.
    pub fn total_pushed(&self) -> u64 {
        self.pushed.values().sum()
    }

    /// Total pulled items across kinds.
    pub fn total_pulled(&self) -> u64 {
        self.pulled.values().sum()
    }
}

/// The response to one sync request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// New cursor; the client persists this and sends it back as
    /// `last_sync_timestamp` next time.
    pub server_timestamp: DateTime<Utc>,
    /// Server-side changes per kind, tombstones included.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub changes: BTreeMap<EntityKind, Vec<EntityChange>>,
    /// Conflicted items from the push phase.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ConflictRecord>,
    /// Recorded errors; a `Sync`-category entry means retry the request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorRecord>,
    /// Counters for the whole exchange.
    pub summary: SyncSummary,
}

impl SyncResponse {
    /// Returns true if the sync completed with no conflicts and no errors.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.errors.is_empty()
    }

    /// Returns the pulled changes for one kind.
    pub fn changes_for(&self, kind: EntityKind) -> &[EntityChange] {
        self.changes.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}
