//! Per-request identity.

use uuid::Uuid;

/// The resolved identity one sync request runs under.
///
/// Produced by the surrounding tenant/identity resolver after
/// authentication; the engine treats it as trusted input and scopes every
/// store access by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncContext {
    /// The caller's tenant.
    pub tenant_id: Uuid,
    /// The calling field agent.
    pub user_id: Uuid,
    /// Elevated callers (dispatch, back office) pull user-scoped kinds
    /// across every agent in the tenant.
    pub elevated: bool,
}

impl SyncContext {
    /// Creates a regular agent context.
    #[must_use]
    pub fn new(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self {
            tenant_id,
            user_id,
            elevated: false,
        }
    }

    /// Grants elevated scope.
    #[must_use]
    pub fn elevate(mut self) -> Self {
        self.elevated = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation() {
        let ctx = SyncContext::new(Uuid::from_u128(1), Uuid::from_u128(2));
        assert!(!ctx.elevated);
        assert!(ctx.elevate().elevated);
    }
}
