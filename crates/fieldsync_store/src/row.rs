//! The stored row envelope and its ledger columns.

use chrono::{DateTime, Utc};
use fieldsync_protocol::{ChangeStamp, EntityChange, EntityKind, EntityPayload};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a stored entity.
///
/// `Deleted` rows are tombstones: they keep their payload and keep flowing
/// through the change feed so deletions reach offline clients. The sync
/// path never removes a row physically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    /// The entity is live.
    Active,
    /// The entity was soft-deleted.
    Deleted,
}

impl EntityState {
    /// Returns true for tombstones.
    pub fn is_deleted(&self) -> bool {
        matches!(self, EntityState::Deleted)
    }
}

/// One stored entity with its change-ledger columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    /// Entity identity, unique within the tenant.
    pub id: Uuid,
    /// Owning tenant; every read and write is scoped by this value.
    pub tenant_id: Uuid,
    /// The field agent the row belongs to, for user-scoped kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<Uuid>,
    /// Monotonic version; starts at 1, +1 per accepted write.
    pub version: u64,
    /// Server timestamp of the last accepted write.
    pub updated_at: DateTime<Utc>,
    /// Live or tombstoned.
    pub state: EntityState,
    /// Business fields.
    pub payload: EntityPayload,
}

impl StoredEntity {
    /// Returns the kind of this row.
    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }

    /// Returns true for tombstones.
    pub fn is_tombstone(&self) -> bool {
        self.state.is_deleted()
    }

    /// Returns the row's concurrency stamp for conflict decisions.
    pub fn stamp(&self) -> ChangeStamp {
        ChangeStamp {
            version: Some(self.version),
            updated_at: Some(self.updated_at),
        }
    }

    /// Maps the row into its outbound change-feed shape.
    pub fn to_change(&self) -> EntityChange {
        EntityChange {
            id: self.id,
            version: self.version,
            updated_at: self.updated_at,
            is_deleted: self.is_tombstone(),
            payload: self.payload.clone(),
        }
    }
}
