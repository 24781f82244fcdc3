//! In-memory store implementation.

use crate::backend::{StoreSession, SyncStore};
use crate::error::{StoreError, StoreResult};
use crate::row::StoredEntity;
use chrono::{DateTime, Utc};
use fieldsync_protocol::EntityKind;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Row key: `(kind, tenant, id)`. Tenant isolation falls out of the key:
/// a scan is always bounded to one `(kind, tenant)` prefix.
type Key = (EntityKind, Uuid, Uuid);

#[derive(Debug, Default)]
struct Faults {
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    poisoned: Mutex<HashSet<Uuid>>,
}

/// An in-memory sync store.
///
/// Sessions stage their writes privately and publish them in one step under
/// the write lock, so concurrent sessions never observe a half-applied
/// request and a dropped session rolls back for free.
///
/// Suitable for unit and integration tests and for single-process
/// deployments; a database-backed store implements the same traits.
///
/// # Example
///
/// ```rust
/// use fieldsync_store::{MemoryStore, SyncStore};
///
/// let store = MemoryStore::new();
/// let session = store.begin().unwrap();
/// session.commit().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<BTreeMap<Key, StoredEntity>>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored rows across all tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Reads one committed row directly, bypassing any session.
    ///
    /// Useful in tests for asserting durable state.
    #[must_use]
    pub fn committed(
        &self,
        kind: EntityKind,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Option<StoredEntity> {
        self.rows.read().get(&(kind, tenant_id, id)).cloned()
    }

    /// Makes the next `begin` fail with an unavailability error.
    pub fn fail_next_begin(&self) {
        self.faults.fail_begin.store(true, Ordering::SeqCst);
    }

    /// Makes the next session `commit` fail, discarding its writes.
    pub fn fail_next_commit(&self) {
        self.faults.fail_commit.store(true, Ordering::SeqCst);
    }

    /// Makes every `put` touching `id` fail with an unavailability error.
    pub fn poison_writes_to(&self, id: Uuid) {
        self.faults.poisoned.lock().insert(id);
    }
}

impl SyncStore for MemoryStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreSession + '_>> {
        if self.faults.fail_begin.swap(false, Ordering::SeqCst) {
            return Err(StoreError::unavailable("store offline"));
        }
        Ok(Box::new(MemorySession {
            rows: Arc::clone(&self.rows),
            faults: Arc::clone(&self.faults),
            staged: BTreeMap::new(),
        }))
    }
}

/// One staged unit of work against a [`MemoryStore`].
struct MemorySession {
    rows: Arc<RwLock<BTreeMap<Key, StoredEntity>>>,
    faults: Arc<Faults>,
    staged: BTreeMap<Key, StoredEntity>,
}

impl MemorySession {
    fn check_row(row: &StoredEntity) -> StoreResult<()> {
        if row.version == 0 {
            return Err(StoreError::constraint("version must start at 1"));
        }
        if row.kind().user_scoped() && row.owner_user_id.is_none() {
            return Err(StoreError::constraint(format!(
                "{} rows require an owner",
                row.kind()
            )));
        }
        Ok(())
    }
}

impl StoreSession for MemorySession {
    fn get(
        &self,
        kind: EntityKind,
        tenant_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<StoredEntity>> {
        let key = (kind, tenant_id, id);
        if let Some(row) = self.staged.get(&key) {
            return Ok(Some(row.clone()));
        }
        Ok(self.rows.read().get(&key).cloned())
    }

    fn put(&mut self, row: StoredEntity) -> StoreResult<()> {
        if self.faults.poisoned.lock().contains(&row.id) {
            return Err(StoreError::unavailable(format!(
                "write rejected for {}",
                row.id
            )));
        }
        Self::check_row(&row)?;
        self.staged.insert((row.kind(), row.tenant_id, row.id), row);
        Ok(())
    }

    fn changed_since(
        &self,
        kind: EntityKind,
        tenant_id: Uuid,
        owner: Option<Uuid>,
        cursor: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<StoredEntity>> {
        let lo = (kind, tenant_id, Uuid::nil());
        let hi = (kind, tenant_id, Uuid::max());

        // Committed rows first, then the session's own writes on top.
        let mut merged: BTreeMap<Uuid, StoredEntity> = BTreeMap::new();
        for (key, row) in self.rows.read().range(lo..=hi) {
            merged.insert(key.2, row.clone());
        }
        for (key, row) in self.staged.range(lo..=hi) {
            merged.insert(key.2, row.clone());
        }

        let mut out: Vec<StoredEntity> = merged
            .into_values()
            .filter(|row| owner.is_none_or(|o| row.owner_user_id == Some(o)))
            .filter(|row| cursor.is_none_or(|c| row.updated_at > c))
            .collect();
        out.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.faults.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::commit_failed("commit fault injected"));
        }
        let mut rows = self.rows.write();
        for (key, row) in self.staged {
            rows.insert(key, row);
        }
        Ok(())
    }
}
