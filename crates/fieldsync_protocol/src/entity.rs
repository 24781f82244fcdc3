//! Syncable entity kinds and their business payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// The kinds of entities that flow through sync.
///
/// The derived `Ord` gives the canonical processing order: catalog and
/// master data first, then the per-agent working set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A customer account within a tenant.
    Customer,
    /// A catalog product (server-authored master data).
    Product,
    /// A sales order taken in the field; owns its order lines.
    Order,
    /// A customer visit logged by an agent.
    Visit,
    /// A delivery route planned by dispatch; owns its stops.
    Route,
}

impl EntityKind {
    /// Every kind, in canonical order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Customer,
        EntityKind::Product,
        EntityKind::Order,
        EntityKind::Visit,
        EntityKind::Route,
    ];

    /// Returns the wire code for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Product => "product",
            EntityKind::Order => "order",
            EntityKind::Visit => "visit",
            EntityKind::Route => "route",
        }
    }

    /// Returns true if rows of this kind belong to a single field agent.
    ///
    /// User-scoped kinds are pulled only for the requesting user unless the
    /// caller holds elevated scope.
    pub fn user_scoped(&self) -> bool {
        matches!(
            self,
            EntityKind::Order | EntityKind::Visit | EntityKind::Route
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized entity kind code.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown entity kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(EntityKind::Customer),
            "product" => Ok(EntityKind::Product),
            "order" => Ok(EntityKind::Order),
            "visit" => Ok(EntityKind::Visit),
            "route" => Ok(EntityKind::Route),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A customer account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Display name.
    pub name: String,
    /// Contact phone number, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Street address, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Credit limit in minor currency units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_limit_cents: Option<i64>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stock-keeping unit code.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Unit price in minor currency units.
    pub unit_price_cents: i64,
}

/// One line of an order.
///
/// Lines carry no version of their own; the owning order's version governs
/// the whole aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The ordered product.
    pub product_id: Uuid,
    /// Ordered quantity.
    pub quantity: u32,
    /// Price per unit at order time, in minor currency units.
    pub unit_price_cents: i64,
}

/// A sales order taken in the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// The buying customer.
    pub customer_id: Uuid,
    /// When the agent recorded the order.
    pub placed_at: DateTime<Utc>,
    /// Free-form note from the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Order lines, synced as part of the order.
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

/// A customer visit logged by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    /// The visited customer.
    pub customer_id: Uuid,
    /// When the visit was or is scheduled.
    pub scheduled_for: DateTime<Utc>,
    /// Outcome notes recorded on site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// One stop on a delivery route.
///
/// Stops carry no version of their own; the owning route's version governs
/// the whole aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    /// The customer to visit at this stop.
    pub customer_id: Uuid,
    /// Position within the route, starting at 1.
    pub position: u32,
}

/// A delivery route planned by dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Display name.
    pub name: String,
    /// The day the route is planned for.
    pub planned_for: DateTime<Utc>,
    /// Stops, synced as part of the route.
    #[serde(default)]
    pub stops: Vec<RouteStop>,
}

/// A typed entity payload, tagged with its kind on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityPayload {
    /// Customer fields.
    Customer(Customer),
    /// Product fields.
    Product(Product),
    /// Order fields, including nested lines.
    Order(Order),
    /// Visit fields.
    Visit(Visit),
    /// Route fields, including nested stops.
    Route(Route),
}

impl EntityPayload {
    /// Returns the kind this payload belongs to.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPayload::Customer(_) => EntityKind::Customer,
            EntityPayload::Product(_) => EntityKind::Product,
            EntityPayload::Order(_) => EntityKind::Order,
            EntityPayload::Visit(_) => EntityKind::Visit,
            EntityPayload::Route(_) => EntityKind::Route,
        }
    }
}
