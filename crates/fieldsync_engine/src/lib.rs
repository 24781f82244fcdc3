//! # FieldSync Engine
//!
//! Push/pull sync orchestration for FieldSync.
//!
//! This crate provides:
//! - The upsert handler (optimistic-concurrency writes, idempotent create,
//!   tombstoning delete)
//! - The change feed query behind the pull phase
//! - The entity registry the orchestrator iterates
//! - `SyncOrchestrator`, the single entry point for one sync request
//! - Clock and configuration seams
//!
//! ## Architecture
//!
//! A request runs **push then pull** inside one store session: client
//! changes are applied first, the change feed is read second (so a device
//! immediately sees the server's view of its own writes), and everything
//! commits together. Item-level problems (validation failures, unknown
//! ids, version conflicts) are recorded in the response and never abort
//! the batch; only an infrastructure fault rolls the request back.
//!
//! ## Key Invariants
//!
//! - The server is the sole version authority
//! - Accepted writes bump the version by exactly one and restamp
//!   `updated_at` from the engine clock
//! - A conflicted write mutates nothing
//! - No query crosses a tenant boundary
//! - Cursors are strict: a row updated exactly at the cursor is not
//!   re-delivered

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod context;
mod error;
mod feed;
mod orchestrator;
mod registry;
mod upsert;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SyncConfig;
pub use context::SyncContext;
pub use error::ItemError;
pub use feed::changes_since;
pub use orchestrator::SyncOrchestrator;
pub use registry::EntityRegistry;
pub use upsert::{PushOutcome, UpsertHandler};
