//! # haul-booking: Booking Engine for GreenHaul
//!
//! Rents moving-supply bundles for a date range against shared physical
//! stock, with a per-day cap on deliveries and pickups.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Booking Engine                                  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 BookingService (assembly)                        │  │
//! │  │  Owns the Database handle and BookingConfig                      │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼──────────────────────┐                 │
//! │         ▼                     ▼                      ▼                  │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌─────────────────────┐   │
//! │  │ PaymentGated   │  │ OrderOrchestrator  │  │ Notification        │   │
//! │  │ Checkout       │─►│                    │  │ Dispatcher          │   │
//! │  │ authorize then │  │ one transaction:   │  │ after commit,       │   │
//! │  │ commit         │  │ lock, check, write │  │ fire-and-forget     │   │
//! │  └────────────────┘  └─────────┬──────────┘  └─────────────────────┘   │
//! │                                │                                        │
//! │               ┌────────────────┼────────────────┐                      │
//! │               ▼                                 ▼                       │
//! │  ┌────────────────────────┐       ┌──────────────────────────┐         │
//! │  │ AvailabilityChecker    │       │ SlotCapacityChecker      │         │
//! │  │ stock − overlapping    │       │ orders per day < cap     │         │
//! │  │ active reservations    │       │ + calendar view          │         │
//! │  └────────────────────────┘       └──────────────────────────┘         │
//! │                                                                         │
//! │  haul-core: bundle expansion, date windows, validation, folios        │
//! │  haul-db:   SQLite pool, repositories, migrations                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`availability`] - Date-scoped stock checks
//! - [`config`] - Booking configuration (TOML + environment)
//! - [`error`] - Booking error taxonomy
//! - [`notify`] - Order confirmations after commit
//! - [`orchestrator`] - The atomic order commit
//! - [`payment`] - Gateway boundary and pay-then-commit checkout
//! - [`service`] - Component wiring and read models
//! - [`slots`] - Daily delivery/pickup capacity
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use haul_booking::{BookingConfig, BookingService, LogNotifier};
//!
//! let config = BookingConfig::load(None)?;
//! let service = BookingService::start(config, Arc::new(LogNotifier)).await?;
//!
//! let order = service.create_order(&request).await?;
//! println!("Booked {}", order.folio);
//!
//! service.shutdown().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod config;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod payment;
pub mod service;
pub mod slots;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use availability::{AvailabilityChecker, Shortage};
pub use config::BookingConfig;
pub use error::{BookingError, BookingResult};
pub use notify::{LogNotifier, NotificationDispatcher, NotificationHandle, Notifier, OrderConfirmed};
pub use orchestrator::{CommittedOrder, CreateOrderRequest, OrderOrchestrator};
pub use payment::{
    Authorization, AuthorizationStatus, CheckoutState, GatewayError, PaidOrder,
    PaymentGatedCheckout, PaymentGateway, PaymentRequest,
};
pub use service::{BookingService, CartCheck, HealthReport, OrderSummary};
pub use slots::SlotCapacityChecker;
