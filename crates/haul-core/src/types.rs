//! # Domain Types
//!
//! Core domain types used throughout the booking engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │   Reservation   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id (internal)  │   │  product_id     │       │
//! │  │  kind           │   │  folio (public) │   │  quantity       │       │
//! │  │  stock (owned)  │   │  status         │   │  date_start/end │       │
//! │  │  price_cents    │   │  delivery/pickup│   │  status         │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ 1─N                                   │
//! │                        ┌────────▼────────┐   ┌─────────────────┐       │
//! │                        │   OrderItem     │   │ OrderAddressLink│       │
//! │                        │  name snapshot  │   │ delivery/pickup │       │
//! │                        │  price snapshot │   │ address ids     │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Orders carry two keys:
//! - `id`: integer primary key, used for relations only
//! - `folio`: human-readable, globally unique, the only key exposed outward

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// Whether a product is rented on its own or composed of other products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Leaf component, tracked by the reservation ledger.
    #[default]
    Standalone,
    /// Sellable composite, expanded before anything is reserved.
    Bundle,
}

/// A product in the rental catalog.
///
/// `stock` is the total number of owned units. It is never decremented at
/// booking time; date-scoped reservations are checked against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
    pub kind: ProductKind,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn is_bundle(&self) -> bool {
        self.kind == ProductKind::Bundle
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// Lifecycle of a reservation row.
///
/// Only `Active` reservations count against availability. Transitions out
/// of `Active` are administrative and happen outside the booking engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    #[default]
    Active,
    Cancelled,
    Completed,
}

/// A date-scoped hold on units of a leaf product.
///
/// `date_end` already includes the cleaning buffer; it is extended once,
/// when the row is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Reservation {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub date_start: NaiveDate,
    #[ts(as = "String")]
    pub date_end: NaiveDate,
    pub user_id: i64,
    pub status: ReservationStatus,
}

// =============================================================================
// Order
// =============================================================================

/// Status of an order. Persisted with the storefront's Spanish labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Booked, payment collected outside the gateway.
    #[default]
    Activo,
    /// Booked and paid through the gateway.
    Pagado,
    Completado,
    Cancelado,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Activo => write!(f, "activo"),
            OrderStatus::Pagado => write!(f, "pagado"),
            OrderStatus::Completado => write!(f, "completado"),
            OrderStatus::Cancelado => write!(f, "cancelado"),
        }
    }
}

/// A committed rental order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub folio: String,
    pub user_id: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub rental_start: NaiveDate,
    #[ts(as = "String")]
    pub rental_end: NaiveDate,
    #[ts(as = "String")]
    pub delivery_date: NaiveDate,
    #[ts(as = "String")]
    pub pickup_date: NaiveDate,
    /// Gateway confirmation id for paid orders.
    pub payment_confirmation: Option<String>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Join record tying an order to its delivery and pickup addresses.
///
/// Address ids are opaque references owned by the address collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderAddressLink {
    pub id: i64,
    pub order_id: i64,
    pub folio: String,
    pub delivery_address_id: i64,
    pub pickup_address_id: i64,
}

/// A line item of an order.
/// Uses snapshot pattern to freeze name and price at time of booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    /// Product name at time of booking (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in centavos at time of booking (frozen).
    pub unit_price_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A cart line as submitted by the storefront. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    /// Catalog product id (bundle or standalone).
    #[serde(rename = "id")]
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    #[serde(rename = "price")]
    pub price_cents: i64,
}

impl CartItem {
    pub fn new(product_id: i64, name: impl Into<String>, quantity: i64, price_cents: i64) -> Self {
        CartItem {
            product_id,
            name: name.into(),
            quantity,
            price_cents,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Slots
// =============================================================================

/// Which side of a rental a logistics slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Delivery,
    Pickup,
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotKind::Delivery => write!(f, "delivery"),
            SlotKind::Pickup => write!(f, "pickup"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
