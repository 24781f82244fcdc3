//! The change feed behind the pull phase.

use crate::context::SyncContext;
use chrono::{DateTime, Utc};
use fieldsync_protocol::{EntityChange, EntityKind};
use fieldsync_store::{StoreResult, StoreSession};

/// Returns every entity of `kind` visible to the caller whose `updated_at`
/// is strictly greater than `cursor` (`None` = full sync).
///
/// User-scoped kinds are filtered to the caller's own rows unless the
/// context is elevated. Tombstones come back with `is_deleted = true`, so
/// clients can tell a deletion from stale data.
pub fn changes_since(
    session: &dyn StoreSession,
    ctx: &SyncContext,
    kind: EntityKind,
    cursor: Option<DateTime<Utc>>,
) -> StoreResult<Vec<EntityChange>> {
    let owner = (kind.user_scoped() && !ctx.elevated).then_some(ctx.user_id);
    let rows = session.changed_since(kind, ctx.tenant_id, owner, cursor)?;
    Ok(rows.iter().map(|row| row.to_change()).collect())
}
