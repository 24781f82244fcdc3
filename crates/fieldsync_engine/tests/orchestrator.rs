//! End-to-end tests for the sync orchestrator.

use fieldsync_engine::{ManualClock, SyncContext, SyncOrchestrator};
use fieldsync_protocol::{
    ChangeRecord, Customer, EntityKind, EntityPayload, ErrorCategory, Order, OrderLine,
    Resolution, SyncRequest,
};
use fieldsync_store::MemoryStore;
use uuid::Uuid;

const TENANT_A: Uuid = Uuid::from_u128(0xA1);
const TENANT_B: Uuid = Uuid::from_u128(0xB1);
const AGENT_1: Uuid = Uuid::from_u128(0x11);
const AGENT_2: Uuid = Uuid::from_u128(0x12);

fn orchestrator() -> SyncOrchestrator<MemoryStore> {
    SyncOrchestrator::new(MemoryStore::new()).with_clock(ManualClock::starting_at(
        "2026-07-01T06:00:00Z".parse().unwrap(),
    ))
}

fn agent(tenant: Uuid, user: Uuid) -> SyncContext {
    SyncContext::new(tenant, user)
}

fn customer(name: &str) -> EntityPayload {
    EntityPayload::Customer(Customer {
        name: name.into(),
        phone: None,
        address: None,
        credit_limit_cents: None,
    })
}

fn order(customer_id: Uuid, quantity: u32) -> EntityPayload {
    EntityPayload::Order(Order {
        customer_id,
        placed_at: "2026-07-01T05:30:00Z".parse().unwrap(),
        note: None,
        lines: vec![OrderLine {
            product_id: Uuid::from_u128(0x99),
            quantity,
            unit_price_cents: 750,
        }],
    })
}

fn push_one(kind: EntityKind, change: ChangeRecord) -> SyncRequest {
    SyncRequest::full_sync().with_changes(kind, [change])
}

#[test]
fn idempotent_create() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);
    let id = Uuid::from_u128(1);
    let create = ChangeRecord::create(id, customer("Acme"));

    let first = orchestrator.sync(&ctx, &push_one(EntityKind::Customer, create.clone()));
    assert!(first.is_clean());
    assert_eq!(first.summary.pushed[&EntityKind::Customer], 1);

    // A retried request replays the same Create.
    let second = orchestrator.sync(&ctx, &push_one(EntityKind::Customer, create));
    assert!(second.is_clean());

    let row = orchestrator
        .store()
        .committed(EntityKind::Customer, TENANT_A, id)
        .unwrap();
    assert_eq!(row.version, 1);
    assert_eq!(orchestrator.store().len(), 1);
}

#[test]
fn conflict_reports_server_wins_and_keeps_server_row() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);
    let id = Uuid::from_u128(1);

    // Walk the row up to version 3.
    orchestrator.sync(
        &ctx,
        &push_one(EntityKind::Customer, ChangeRecord::create(id, customer("v1"))),
    );
    orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::update(id, 1, customer("v2")),
        ),
    );
    orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::update(id, 2, customer("v3")),
        ),
    );

    // Another device edited against version 2.
    let response = orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::update(id, 2, customer("stale")),
        ),
    );

    assert_eq!(response.conflicts.len(), 1);
    let conflict = &response.conflicts[0];
    assert_eq!(conflict.kind, EntityKind::Customer);
    assert_eq!(conflict.entity_id, id);
    assert_eq!(conflict.resolution, Resolution::ServerWins);
    assert_eq!(response.summary.conflicts, 1);
    assert_eq!(response.summary.total_pushed(), 0);

    let row = orchestrator
        .store()
        .committed(EntityKind::Customer, TENANT_A, id)
        .unwrap();
    assert_eq!(row.version, 3);
    assert_eq!(row.payload, customer("v3"));
}

#[test]
fn accepted_update_bumps_version_exactly_once() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);
    let id = Uuid::from_u128(1);

    orchestrator.sync(
        &ctx,
        &push_one(EntityKind::Customer, ChangeRecord::create(id, customer("a"))),
    );
    let before = orchestrator
        .store()
        .committed(EntityKind::Customer, TENANT_A, id)
        .unwrap();

    let response = orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::update(id, 1, customer("b")),
        ),
    );
    assert!(response.is_clean());

    let after = orchestrator
        .store()
        .committed(EntityKind::Customer, TENANT_A, id)
        .unwrap();
    assert_eq!(after.version, before.version + 1);
    assert!(after.updated_at > before.updated_at);
}

#[test]
fn tenant_isolation_on_pull() {
    let orchestrator = orchestrator();
    // The same entity id exists in both tenants.
    let id = Uuid::from_u128(1);

    orchestrator.sync(
        &agent(TENANT_A, AGENT_1),
        &push_one(EntityKind::Customer, ChangeRecord::create(id, customer("A's"))),
    );
    orchestrator.sync(
        &agent(TENANT_B, AGENT_2),
        &push_one(EntityKind::Customer, ChangeRecord::create(id, customer("B's"))),
    );

    // Full pull scoped to tenant A.
    let response = orchestrator.sync(&agent(TENANT_A, AGENT_1), &SyncRequest::full_sync());
    let pulled = response.changes_for(EntityKind::Customer);
    assert_eq!(pulled.len(), 1);
    assert_eq!(pulled[0].payload, customer("A's"));
}

#[test]
fn cursor_is_complete_and_exclusive() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);

    let first = orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::create(Uuid::from_u128(1), customer("a")),
        ),
    );
    // The push is echoed back by the same response's pull.
    assert_eq!(first.changes_for(EntityKind::Customer).len(), 1);

    // Resyncing from the returned cursor is empty absent further writes.
    let second = orchestrator.sync(&ctx, &SyncRequest::since(first.server_timestamp));
    assert!(second.changes_for(EntityKind::Customer).is_empty());
    assert_eq!(second.summary.total_pulled(), 0);

    // A later write surfaces on the next cursor pull, once.
    orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::create(Uuid::from_u128(2), customer("b")),
        ),
    );
    let third = orchestrator.sync(&ctx, &SyncRequest::since(second.server_timestamp));
    let pulled = third.changes_for(EntityKind::Customer);
    assert_eq!(pulled.len(), 1);
    assert_eq!(pulled[0].id, Uuid::from_u128(2));
}

#[test]
fn partial_batch_durability() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);

    let request = SyncRequest::full_sync().with_changes(
        EntityKind::Customer,
        [
            ChangeRecord::create(Uuid::from_u128(1), customer("first")),
            // Update of an id the server has never seen.
            ChangeRecord::update(Uuid::from_u128(50), 1, customer("ghost")),
            ChangeRecord::create(Uuid::from_u128(3), customer("third")),
        ],
    );

    let response = orchestrator.sync(&ctx, &request);
    assert_eq!(response.summary.pushed[&EntityKind::Customer], 2);
    assert_eq!(response.summary.errors, 1);
    assert_eq!(response.errors[0].category, ErrorCategory::NotFound);
    assert_eq!(response.errors[0].entity_id, Some(Uuid::from_u128(50)));

    // Items around the failed one are durable and pull back.
    let pull = orchestrator.sync(&agent(TENANT_A, AGENT_2), &SyncRequest::full_sync());
    let pulled = pull.changes_for(EntityKind::Customer);
    assert_eq!(pulled.len(), 2);
}

#[test]
fn tombstones_propagate_to_stale_cursors() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);
    let id = Uuid::from_u128(1);

    let created = orchestrator.sync(
        &ctx,
        &push_one(EntityKind::Customer, ChangeRecord::create(id, customer("doomed"))),
    );
    let cursor_before_delete = created.server_timestamp;

    orchestrator.sync(
        &ctx,
        &push_one(EntityKind::Customer, ChangeRecord::delete(id, 1)),
    );

    // A device that last synced before the delete still hears about it.
    let response = orchestrator.sync(&ctx, &SyncRequest::since(cursor_before_delete));
    let pulled = response.changes_for(EntityKind::Customer);
    assert_eq!(pulled.len(), 1);
    assert!(pulled[0].is_deleted);
    assert_eq!(pulled[0].version, 2);
}

#[test]
fn user_scoped_pull_and_elevation() {
    let orchestrator = orchestrator();
    let customer_id = Uuid::from_u128(0x55);

    orchestrator.sync(
        &agent(TENANT_A, AGENT_1),
        &push_one(
            EntityKind::Order,
            ChangeRecord::create(Uuid::from_u128(1), order(customer_id, 2)),
        ),
    );
    orchestrator.sync(
        &agent(TENANT_A, AGENT_2),
        &push_one(
            EntityKind::Order,
            ChangeRecord::create(Uuid::from_u128(2), order(customer_id, 5)),
        ),
    );

    // Each agent pulls only their own orders.
    let mine = orchestrator.sync(&agent(TENANT_A, AGENT_1), &SyncRequest::full_sync());
    assert_eq!(mine.changes_for(EntityKind::Order).len(), 1);

    // Dispatch sees the whole tenant.
    let dispatch = orchestrator.sync(
        &agent(TENANT_A, AGENT_1).elevate(),
        &SyncRequest::full_sync(),
    );
    assert_eq!(dispatch.changes_for(EntityKind::Order).len(), 2);
}

#[test]
fn pull_filter_restricts_kinds() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);

    orchestrator.sync(
        &ctx,
        &SyncRequest::full_sync()
            .with_changes(
                EntityKind::Customer,
                [ChangeRecord::create(Uuid::from_u128(1), customer("a"))],
            )
            .with_changes(
                EntityKind::Order,
                [ChangeRecord::create(
                    Uuid::from_u128(2),
                    order(Uuid::from_u128(1), 1),
                )],
            ),
    );

    let response = orchestrator.sync(
        &ctx,
        &SyncRequest::full_sync().with_kinds([EntityKind::Order]),
    );
    assert!(response.changes_for(EntityKind::Order).len() == 1);
    assert!(response.changes_for(EntityKind::Customer).is_empty());
    assert!(!response.changes.contains_key(&EntityKind::Customer));
}

#[test]
fn commit_failure_reports_sync_error_and_persists_nothing() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);
    orchestrator.store().fail_next_commit();

    let response = orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::create(Uuid::from_u128(1), customer("lost")),
        ),
    );

    let sync_errors: Vec<_> = response
        .errors
        .iter()
        .filter(|e| e.category == ErrorCategory::Sync)
        .collect();
    assert_eq!(sync_errors.len(), 1);
    assert!(orchestrator.store().is_empty());

    // The retry goes through untouched.
    let retry = orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::create(Uuid::from_u128(1), customer("lost")),
        ),
    );
    assert!(retry.is_clean());
    assert_eq!(orchestrator.store().len(), 1);
}

#[test]
fn per_item_storage_fault_spares_the_rest_of_the_batch() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);
    let poisoned = Uuid::from_u128(2);
    orchestrator.store().poison_writes_to(poisoned);

    let request = SyncRequest::full_sync().with_changes(
        EntityKind::Customer,
        [
            ChangeRecord::create(Uuid::from_u128(1), customer("ok-1")),
            ChangeRecord::create(poisoned, customer("cursed")),
            ChangeRecord::create(Uuid::from_u128(3), customer("ok-2")),
        ],
    );

    let response = orchestrator.sync(&ctx, &request);
    assert_eq!(response.summary.pushed[&EntityKind::Customer], 2);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].category, ErrorCategory::Storage);
    assert_eq!(orchestrator.store().len(), 2);
}

#[test]
fn two_devices_one_winner() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);
    let id = Uuid::from_u128(1);

    // Both devices start from the same synced state at version 1.
    orchestrator.sync(
        &ctx,
        &push_one(EntityKind::Customer, ChangeRecord::create(id, customer("base"))),
    );

    // The phone syncs first and wins.
    let phone = orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::update(id, 1, customer("phone edit")),
        ),
    );
    assert!(phone.is_clean());

    // The tablet pushes its own edit against the same base and loses.
    let tablet = orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Customer,
            ChangeRecord::update(id, 1, customer("tablet edit")),
        ),
    );
    assert_eq!(tablet.conflicts.len(), 1);

    // The tablet's pull in that same response carries the winning state to
    // re-present to the agent.
    let echoed = tablet.changes_for(EntityKind::Customer);
    assert_eq!(echoed.len(), 1);
    assert_eq!(echoed[0].payload, customer("phone edit"));
    assert_eq!(echoed[0].version, 2);
}

#[test]
fn order_aggregate_syncs_lines_with_parent_version() {
    let orchestrator = orchestrator();
    let ctx = agent(TENANT_A, AGENT_1);
    let id = Uuid::from_u128(1);
    let customer_id = Uuid::from_u128(0x55);

    orchestrator.sync(
        &ctx,
        &push_one(EntityKind::Order, ChangeRecord::create(id, order(customer_id, 2))),
    );
    // Replacing the lines is one aggregate write, one version bump.
    let response = orchestrator.sync(
        &ctx,
        &push_one(
            EntityKind::Order,
            ChangeRecord::update(id, 1, order(customer_id, 7)),
        ),
    );
    assert!(response.is_clean());

    let row = orchestrator
        .store()
        .committed(EntityKind::Order, TENANT_A, id)
        .unwrap();
    assert_eq!(row.version, 2);
    let EntityPayload::Order(stored) = &row.payload else {
        panic!("expected an order payload");
    };
    assert_eq!(stored.lines[0].quantity, 7);
}
