//! Change records exchanged during push and pull.

use crate::conflict::ChangeStamp;
use crate::entity::EntityPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The operation a client performed on an entity while offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// The entity was created on the device.
    Create,
    /// An existing entity was edited.
    Update,
    /// The entity was deleted (soft-delete on the server).
    Delete,
}

/// A single client change submitted during the push phase.
///
/// `base_version` and `base_updated_at` describe the server state the client
/// last saw before editing; they drive the optimistic-concurrency check.
/// Neither is ever used as the new server state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Entity identity, client-generated and permanent.
    pub id: Uuid,
    /// What the client did.
    pub operation: Operation,
    /// The version the client last saw, if it tracks versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,
    /// The server timestamp the client last saw; fallback for legacy
    /// clients that omit `base_version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_updated_at: Option<DateTime<Utc>>,
    /// The entity's business fields; absent for `Delete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EntityPayload>,
}

impl ChangeRecord {
    /// Creates a `Create` change.
    pub fn create(id: Uuid, payload: EntityPayload) -> Self {
        Self {
            id,
            operation: Operation::Create,
            base_version: None,
            base_updated_at: None,
            payload: Some(payload),
        }
    }

    /// Creates an `Update` change against a known base version.
    pub fn update(id: Uuid, base_version: u64, payload: EntityPayload) -> Self {
        Self {
            id,
            operation: Operation::Update,
            base_version: Some(base_version),
            base_updated_at: None,
            payload: Some(payload),
        }
    }

    /// Creates a `Delete` change against a known base version.
    pub fn delete(id: Uuid, base_version: u64) -> Self {
        Self {
            id,
            operation: Operation::Delete,
            base_version: Some(base_version),
            base_updated_at: None,
            payload: None,
        }
    }

    /// Sets the base timestamp the client last saw.
    pub fn with_base_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.base_updated_at = Some(at);
        self
    }

    /// Returns what the client knew about the entity, for conflict checks.
    pub fn stamp(&self) -> ChangeStamp {
        ChangeStamp {
            version: self.base_version,
            updated_at: self.base_updated_at,
        }
    }
}

/// The server-side state of one entity, as returned by the pull phase.
///
/// Tombstoned entities are returned with `is_deleted = true` rather than
/// omitted, so deletions propagate to offline clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityChange {
    /// Entity identity.
    pub id: Uuid,
    /// Current server version.
    pub version: u64,
    /// Server timestamp of the last accepted write.
    pub updated_at: DateTime<Utc>,
    /// True for tombstones.
    pub is_deleted: bool,
    /// Current business fields (last state before deletion, for tombstones).
    pub payload: EntityPayload,
}
