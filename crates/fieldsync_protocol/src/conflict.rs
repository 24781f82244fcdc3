//! Conflict detection between client changes and server rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What one side knew about an entity at decision time.
///
/// The server side always carries both fields; a client may omit the
/// version (legacy devices) or both (a change against a row it never saw).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeStamp {
    /// Monotonic entity version, if tracked.
    pub version: Option<u64>,
    /// Server timestamp of the last write the side observed.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChangeStamp {
    /// Creates a stamp carrying a version.
    pub fn at_version(version: u64) -> Self {
        Self {
            version: Some(version),
            updated_at: None,
        }
    }

    /// Creates a stamp carrying only a timestamp.
    pub fn at_time(updated_at: DateTime<Utc>) -> Self {
        Self {
            version: None,
            updated_at: Some(updated_at),
        }
    }
}

/// Outcome of comparing a client change against the current server row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The client based its edit on the current row; apply the write.
    Accept,
    /// The client's base is stale; discard the write, the server row stands.
    ServerWins,
}

impl Decision {
    /// Returns true if the write should be applied.
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Strategy seam for conflict resolution.
///
/// Implementations must be pure: no I/O, no side effects, deterministic for
/// a given pair of stamps. A future field-level-merge policy replaces the
/// stock one here without touching the orchestrator.
pub trait ResolutionPolicy: Send + Sync {
    /// Decides the fate of a client write given both sides' stamps.
    fn decide(&self, client: &ChangeStamp, server: &ChangeStamp) -> Decision;
}

/// The stock policy: a conflicting write is fully discarded and the
/// server's current state is authoritative.
///
/// Version comparison decides when both sides carry one; the timestamp is
/// only consulted for clients that omit the version. A client claiming a
/// version *ahead* of the server's is treated as conflicted too: the
/// server is the sole version authority, so such a stamp proves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerWinsPolicy;

impl ResolutionPolicy for ServerWinsPolicy {
    fn decide(&self, client: &ChangeStamp, server: &ChangeStamp) -> Decision {
        match (client.version, server.version) {
            (Some(client_v), Some(server_v)) => {
                if client_v == server_v {
                    Decision::Accept
                } else {
                    Decision::ServerWins
                }
            }
            _ => match (client.updated_at, server.updated_at) {
                (Some(client_t), Some(server_t)) => {
                    if client_t >= server_t {
                        Decision::Accept
                    } else {
                        Decision::ServerWins
                    }
                }
                // Nothing proves the client ever saw the server row.
                _ => Decision::ServerWins,
            },
        }
    }
}

/// How a reported conflict was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The server's state survived; the client write was discarded.
    ServerWins,
}
