//! Store and session trait definitions.

use crate::error::StoreResult;
use crate::row::StoredEntity;
use chrono::{DateTime, Utc};
use fieldsync_protocol::EntityKind;
use uuid::Uuid;

/// A transactional store of syncable entities.
///
/// One session spans exactly one sync request: all of the request's push
/// mutations and its pull reads happen inside a single session, and the
/// mutations become durable together when the session commits.
///
/// # Invariants
///
/// - Every operation is keyed by `(kind, tenant_id, id)`; no call ever
///   observes rows from another tenant
/// - `get` and `changed_since` see the session's own staged writes
/// - A session dropped without `commit` publishes nothing
/// - Stores must be `Send + Sync`; many sessions may be open concurrently
///   and the store serializes their commits
pub trait SyncStore: Send + Sync {
    /// Opens a unit of work.
    fn begin(&self) -> StoreResult<Box<dyn StoreSession + '_>>;
}

/// One unit of work against the store.
pub trait StoreSession {
    /// Reads one row.
    fn get(
        &self,
        kind: EntityKind,
        tenant_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<StoredEntity>>;

    /// Stages a row write; visible to this session's reads immediately,
    /// durable only after `commit`.
    fn put(&mut self, row: StoredEntity) -> StoreResult<()>;

    /// Returns rows of `kind` in `tenant_id` with `updated_at` strictly
    /// greater than `cursor` (every row when `cursor` is `None`), filtered
    /// to `owner` when given, ordered by `updated_at`. Tombstones are
    /// included.
    fn changed_since(
        &self,
        kind: EntityKind,
        tenant_id: Uuid,
        owner: Option<Uuid>,
        cursor: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<StoredEntity>>;

    /// Publishes every staged write atomically.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}
