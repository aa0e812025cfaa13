//! # haul-db: Database Layer for GreenHaul Booking
//!
//! This crate provides database access for the booking engine.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     GreenHaul Booking Data Flow                         │
//! │                                                                         │
//! │  haul-booking (checkers, orchestrator)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     haul-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo    │   │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ ReservationRepo│   │   _schema    │  │   │
//! │  │   │ health_check  │    │ OrderRepo      │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pool vs. Connection Methods
//!
//! Read helpers come in two flavours. Methods on a repository run against
//! the pool. Associated functions that take `&mut SqliteConnection` run on
//! whatever connection they are handed, which is how the orchestrator keeps
//! every read and write of a booking inside one transaction.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use haul_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("greenhaul.db")).await?;
//! let catalog = db.products().load_catalog().await?;
//! let order = db.orders().find_by_folio("GH-20240601-142233-9F3A1C").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::order::{NewOrder, OrderRepository};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::reservation::{NewReservation, ReservationRepository};
