//! # FieldSync Protocol
//!
//! Wire contract and pure decision logic for FieldSync.
//!
//! This crate provides:
//! - `EntityKind` and the typed entity payloads (customers, products,
//!   orders, visits, routes)
//! - `ChangeRecord` / `EntityChange` for the push and pull halves of a sync
//! - Request/response messages exchanged with field devices
//! - The conflict resolver (`ResolutionPolicy` and the stock server-wins
//!   policy)
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod conflict;
mod entity;
mod messages;

pub use change::{ChangeRecord, EntityChange, Operation};
pub use conflict::{ChangeStamp, Decision, Resolution, ResolutionPolicy, ServerWinsPolicy};
pub use entity::{
    Customer, EntityKind, EntityPayload, Order, OrderLine, Product, Route, RouteStop,
    UnknownKind, Visit,
};
pub use messages::{
    ConflictRecord, ErrorCategory, ErrorRecord, SyncRequest, SyncResponse, SyncSummary,
};
