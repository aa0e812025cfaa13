//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pool-bound methods                 Connection-bound functions          │
//! │  ──────────────────                 ──────────────────────────          │
//! │  db.orders().find_by_folio(..)      OrderRepository::insert_on(conn,..) │
//! │  db.products().load_catalog()       ProductRepository::lock_for_booking │
//! │  db.reservations().list_for_order   ReservationRepository::insert_on    │
//! │        │                                     │                          │
//! │        ▼                                     ▼                          │
//! │  own pooled connection              caller's transaction                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog and bundle compositions
//! - [`reservation::ReservationRepository`] - The reservation ledger
//! - [`order::OrderRepository`] - Orders, address links, items, slot counts

pub mod order;
pub mod product;
pub mod reservation;
