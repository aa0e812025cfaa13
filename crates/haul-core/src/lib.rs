//! # haul-core: Pure Booking Logic for GreenHaul
//!
//! This crate is the **heart** of the GreenHaul booking engine. It contains
//! every rule that can be decided without touching the database: bundle
//! expansion, date-range overlap, slot arithmetic and cart validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      GreenHaul Booking Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Transport (HTTP / CLI, outside this workspace)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  haul-booking (engine)                          │   │
//! │  │   checkers, orchestrator, payment gate, notifications           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ haul-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐ │   │
//! │  │   │  bundle   │  │availability│  │   slots   │  │ validation│ │   │
//! │  │   │ Catalog   │  │  overlap   │  │ calendar  │  │  carts    │ │   │
//! │  │   │ expand()  │  │  cleaning  │  │  cap = 3  │  │  dates    │ │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    haul-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Reservation, Order, CartItem, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`bundle`] - Bundle compositions and cart expansion
//! - [`availability`] - Overlap and remaining-stock arithmetic
//! - [`slots`] - Daily delivery/pickup capacity and calendar projection
//! - [`folio`] - Human-readable order identifiers
//! - [`validation`] - Cart and date validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use haul_core::bundle::{BundleCatalog, BundleComponent, CartLine};
//!
//! // Bundle 100 = 2 × product 1
//! let catalog = BundleCatalog::new([(100, vec![BundleComponent::new(1, 2)])]).unwrap();
//!
//! let needs = catalog.expand(&[CartLine::new(100, 3), CartLine::new(1, 1)]).unwrap();
//! assert_eq!(needs.get(&1), Some(&7));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod bundle;
pub mod error;
pub mod folio;
pub mod money;
pub mod slots;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use bundle::{BundleCatalog, BundleComponent, CartLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of deliveries (and, independently, pickups) per calendar day.
///
/// Can be overridden through the booking configuration.
pub const DAILY_SLOT_CAP: i64 = 3;

/// Days a returned unit stays out of circulation for cleaning.
pub const CLEANING_DAYS: u64 = 1;

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single cart line.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
