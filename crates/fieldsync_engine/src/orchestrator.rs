//! The sync orchestrator: one entry point per request.

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::feed;
use crate::registry::EntityRegistry;
use crate::upsert::{PushOutcome, UpsertHandler};
use fieldsync_protocol::{
    ConflictRecord, EntityKind, ErrorCategory, ErrorRecord, ResolutionPolicy, ServerWinsPolicy,
    SyncRequest, SyncResponse, SyncSummary,
};
use fieldsync_store::{StoreError, SyncStore};
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Drives one sync request end to end: push, pull, commit.
///
/// The orchestrator always answers with a structured [`SyncResponse`]:
/// item-level problems become conflict or error records, and even a failed
/// begin/commit is reported as a single `Sync`-category error rather than
/// propagated. Construction follows the builder style:
///
/// ```rust
/// use fieldsync_engine::{SyncConfig, SyncOrchestrator};
/// use fieldsync_store::MemoryStore;
///
/// let orchestrator = SyncOrchestrator::new(MemoryStore::new())
///     .with_config(SyncConfig::new().with_max_push_batch(200));
/// ```
pub struct SyncOrchestrator<S: SyncStore> {
    store: S,
    policy: Box<dyn ResolutionPolicy>,
    clock: Box<dyn Clock>,
    registry: EntityRegistry,
    config: SyncConfig,
}

impl<S: SyncStore> SyncOrchestrator<S> {
    /// Creates an orchestrator with the stock server-wins policy, the
    /// system clock, and every entity kind registered.
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: Box::new(ServerWinsPolicy),
            clock: Box::new(SystemClock::new()),
            registry: EntityRegistry::all(),
            config: SyncConfig::default(),
        }
    }

    /// Replaces the conflict policy.
    #[must_use]
    pub fn with_policy(mut self, policy: impl ResolutionPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replaces the entity registry.
    #[must_use]
    pub fn with_registry(mut self, registry: EntityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the store this orchestrator writes to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one sync request under the given identity.
    pub fn sync(&self, ctx: &SyncContext, request: &SyncRequest) -> SyncResponse {
        let mut conflicts: Vec<ConflictRecord> = Vec::new();
        let mut errors: Vec<ErrorRecord> = Vec::new();
        let mut summary = SyncSummary::default();
        let mut changes: BTreeMap<EntityKind, Vec<_>> = BTreeMap::new();

        let mut session = match self.store.begin() {
            Ok(session) => session,
            Err(err) => return self.fault_response(err),
        };

        // Push phase: apply client changes in registry order, in input
        // order within a kind.
        let handler = UpsertHandler::new(self.policy.as_ref(), self.clock.as_ref());
        for kind in self.registry.kinds() {
            let Some(batch) = request.changes.get(&kind) else {
                continue;
            };
            if batch.len() > self.config.max_push_batch {
                errors.push(ErrorRecord::validation(
                    Some(kind),
                    None,
                    None,
                    format!(
                        "batch of {} changes exceeds limit {}",
                        batch.len(),
                        self.config.max_push_batch
                    ),
                ));
                continue;
            }
            for change in batch {
                match handler.apply(session.as_mut(), ctx, kind, change) {
                    Ok(PushOutcome::Applied(_)) => summary.record_pushed(kind),
                    Ok(PushOutcome::Conflict(conflict)) => conflicts.push(conflict),
                    Err(item) => {
                        errors.push(item.into_record(kind, change.id, change.operation));
                    }
                }
            }
        }
        for kind in request.changes.keys() {
            if !self.registry.contains(*kind) {
                errors.push(ErrorRecord::validation(
                    Some(*kind),
                    None,
                    None,
                    format!("{kind} is not a registered kind"),
                ));
            }
        }

        // Pull phase: the same session, so the push phase's writes come
        // back with their new server state.
        for kind in self.requested_kinds(request, &mut errors) {
            match feed::changes_since(session.as_ref(), ctx, kind, request.last_sync_timestamp) {
                Ok(pulled) => {
                    summary.record_pulled(kind, pulled.len() as u64);
                    changes.insert(kind, pulled);
                }
                Err(err) => {
                    errors.push(ErrorRecord {
                        category: ErrorCategory::Storage,
                        kind: Some(kind),
                        entity_id: None,
                        operation: None,
                        message: format!("pull failed for {kind}"),
                        details: Some(err.to_string()),
                    });
                }
            }
        }

        // Finalize: the cursor is stamped after every write of this
        // request, so the next strict-inequality pull skips them.
        let server_timestamp = self.clock.now();
        if let Err(err) = session.commit() {
            error!(tenant = %ctx.tenant_id, %err, "sync commit failed");
            errors.push(ErrorRecord::sync("sync failed; retry the request")
                .with_details(err.to_string()));
        }

        summary.conflicts = conflicts.len() as u64;
        summary.errors = errors.len() as u64;
        debug!(
            tenant = %ctx.tenant_id,
            user = %ctx.user_id,
            pushed = summary.total_pushed(),
            pulled = summary.total_pulled(),
            conflicts = summary.conflicts,
            errors = summary.errors,
            "sync complete"
        );

        SyncResponse {
            server_timestamp,
            changes,
            conflicts,
            errors,
            summary,
        }
    }

    /// Kinds the pull phase covers: the request's filter intersected with
    /// the registry, or the whole registry when the filter is empty.
    fn requested_kinds(
        &self,
        request: &SyncRequest,
        errors: &mut Vec<ErrorRecord>,
    ) -> Vec<EntityKind> {
        if request.entity_kinds.is_empty() {
            return self.registry.kinds().collect();
        }
        let mut kinds = Vec::new();
        for kind in &request.entity_kinds {
            if !self.registry.contains(*kind) {
                errors.push(ErrorRecord::validation(
                    Some(*kind),
                    None,
                    None,
                    format!("{kind} is not a registered kind"),
                ));
            } else if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }

    fn fault_response(&self, err: StoreError) -> SyncResponse {
        error!(%err, "sync could not open a unit of work");
        SyncResponse {
            server_timestamp: self.clock.now(),
            changes: BTreeMap::new(),
            conflicts: Vec::new(),
            errors: vec![
                ErrorRecord::sync("sync failed; retry the request").with_details(err.to_string()),
            ],
            summary: SyncSummary {
                errors: 1,
                ..SyncSummary::default()
            },
        }
    }
}
