//! Applying client changes with optimistic-concurrency checking.

use crate::clock::Clock;
use crate::context::SyncContext;
use crate::error::ItemError;
use fieldsync_protocol::{
    ChangeRecord, ConflictRecord, EntityKind, Operation, Resolution, ResolutionPolicy,
};
use fieldsync_store::{EntityState, StoreSession, StoredEntity};
use tracing::warn;

/// Result of processing one change record.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// The write was applied (or was an idempotent replay); the row is the
    /// entity's current server state.
    Applied(StoredEntity),
    /// The optimistic check failed; nothing was mutated and the server row
    /// stands.
    Conflict(ConflictRecord),
}

/// Applies client change records for one entity kind.
///
/// The handler performs exactly one row mutation per accepted change and
/// none for conflicts; every failure it returns concerns only the item at
/// hand.
pub struct UpsertHandler<'a> {
    policy: &'a dyn ResolutionPolicy,
    clock: &'a dyn Clock,
}

impl<'a> UpsertHandler<'a> {
    /// Creates a handler using the given conflict policy and clock.
    pub fn new(policy: &'a dyn ResolutionPolicy, clock: &'a dyn Clock) -> Self {
        Self { policy, clock }
    }

    /// Applies one change within the session.
    pub fn apply(
        &self,
        session: &mut dyn StoreSession,
        ctx: &SyncContext,
        kind: EntityKind,
        change: &ChangeRecord,
    ) -> Result<PushOutcome, ItemError> {
        self.validate(kind, change)?;

        let existing = session.get(kind, ctx.tenant_id, change.id)?;

        match change.operation {
            Operation::Create => self.apply_create(session, ctx, kind, change, existing),
            Operation::Update | Operation::Delete => {
                let Some(server) = existing else {
                    return Err(ItemError::NotFound {
                        entity_id: change.id,
                    });
                };
                self.apply_write(session, kind, change, server)
            }
        }
    }

    fn validate(&self, kind: EntityKind, change: &ChangeRecord) -> Result<(), ItemError> {
        match &change.payload {
            None if change.operation != Operation::Delete => Err(ItemError::validation(format!(
                "{:?} requires a payload",
                change.operation
            ))),
            Some(payload) if payload.kind() != kind => Err(ItemError::validation(format!(
                "payload of kind {} in a {} batch",
                payload.kind(),
                kind
            ))),
            _ => Ok(()),
        }
    }

    fn apply_create(
        &self,
        session: &mut dyn StoreSession,
        ctx: &SyncContext,
        kind: EntityKind,
        change: &ChangeRecord,
        existing: Option<StoredEntity>,
    ) -> Result<PushOutcome, ItemError> {
        // Duplicate submission (a retried request): idempotent no-op.
        if let Some(row) = existing {
            return Ok(PushOutcome::Applied(row));
        }

        let payload = change
            .payload
            .clone()
            .ok_or_else(|| ItemError::validation("Create requires a payload"))?;

        let row = StoredEntity {
            id: change.id,
            tenant_id: ctx.tenant_id,
            owner_user_id: kind.user_scoped().then_some(ctx.user_id),
            version: 1,
            updated_at: self.clock.now(),
            state: EntityState::Active,
            payload,
        };
        session.put(row.clone())?;
        Ok(PushOutcome::Applied(row))
    }

    fn apply_write(
        &self,
        session: &mut dyn StoreSession,
        kind: EntityKind,
        change: &ChangeRecord,
        server: StoredEntity,
    ) -> Result<PushOutcome, ItemError> {
        if let Some(client_version) = change.base_version {
            if client_version > server.version {
                // The server is the sole version authority; a client
                // claiming a newer version indicates a corrupted or forged
                // stamp. Resolved as a conflict.
                warn!(
                    kind = %kind,
                    entity_id = %change.id,
                    client_version,
                    server_version = server.version,
                    "client version ahead of server"
                );
            }
        }

        if !self.policy.decide(&change.stamp(), &server.stamp()).is_accept() {
            return Ok(PushOutcome::Conflict(ConflictRecord {
                kind,
                entity_id: change.id,
                client_modified: change.base_updated_at,
                server_modified: server.updated_at,
                resolution: Resolution::ServerWins,
            }));
        }

        let mut row = server;
        row.version += 1;
        row.updated_at = self.clock.now();
        if change.operation == Operation::Delete {
            row.state = EntityState::Deleted;
        } else {
            // Field changes replace the whole aggregate; lifecycle state is
            // not an updatable field.
            row.payload = change
                .payload
                .clone()
                .ok_or_else(|| ItemError::validation("Update requires a payload"))?;
        }
        session.put(row.clone())?;
        Ok(PushOutcome::Applied(row))
    }
}
