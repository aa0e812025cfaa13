//! # Booking Error Types
//!
//! Everything a booking attempt can report back to its caller.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Booking Error Categories                           │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌───────────────────────┐ │
//! │  │  Request         │  │  Capacity        │  │  Payment              │ │
//! │  │                  │  │                  │  │                       │ │
//! │  │  InvalidCart     │  │  Insufficient    │  │  PaymentDeclined      │ │
//! │  │  AddressRequired │  │   Inventory      │  │  PaymentTimeout       │ │
//! │  │  DateRange...    │  │  SlotFull        │  │  PaymentUnavailable   │ │
//! │  │  InvalidComp...  │  │  ProductNotFound │  │  PaymentAmount        │ │
//! │  └──────────────────┘  └──────────────────┘  │   Mismatch            │ │
//! │                                              │  PostPayment          │ │
//! │                                              │   Persistence (!)     │ │
//! │                                              └───────────────────────┘ │
//! │  ┌──────────────────┐  ┌──────────────────┐                            │
//! │  │  Commit          │  │  Infrastructure  │                            │
//! │  │                  │  │                  │                            │
//! │  │  DuplicateFolio  │  │  Config          │                            │
//! │  │  Transaction     │  │  Database        │                            │
//! │  │   Timeout        │  │                  │                            │
//! │  └──────────────────┘  └──────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Request and capacity errors are raised before any durable write, so the
//! ledger is exactly as it was. `PostPaymentPersistence` is the one case
//! where money moved without a committed order.

use chrono::NaiveDate;
use thiserror::Error;

use haul_core::{CoreError, SlotKind};
use haul_db::DbError;

/// Result type alias for booking operations.
pub type BookingResult<T> = Result<T, BookingError>;

/// Booking error type.
#[derive(Debug, Error)]
pub enum BookingError {
    // =========================================================================
    // Request Errors
    // =========================================================================
    /// Empty cart, too many lines, or a line with a bad name/quantity/price.
    #[error("Invalid cart: {reason}")]
    InvalidCart { reason: String },

    /// A bundle without a usable composition.
    #[error("Invalid composition for bundle {bundle_id}: {reason}")]
    InvalidComposition { bundle_id: i64, reason: String },

    #[error("{kind} address is required")]
    AddressRequired { kind: String },

    #[error("{field} is required")]
    DateRangeRequired { field: String },

    #[error("Invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    // =========================================================================
    // Capacity Errors
    // =========================================================================
    /// Not enough free units of a leaf product in the requested window.
    #[error(
        "Insufficient inventory for {product_name} (id {product_id}): requested {requested}, available {available}"
    )]
    InsufficientInventory {
        product_id: i64,
        product_name: String,
        requested: i64,
        available: i64,
    },

    /// The day already has the maximum number of deliveries or pickups.
    #[error("No {kind} slots left on {date} (cap {cap})")]
    SlotFull {
        date: NaiveDate,
        kind: SlotKind,
        cap: i64,
    },

    #[error("Product {product_id} not found")]
    ProductNotFound { product_id: i64 },

    // =========================================================================
    // Commit Errors
    // =========================================================================
    /// Folio collided with an existing order after the internal retry.
    #[error("Duplicate folio: {folio}")]
    DuplicateFolio { folio: String },

    /// Locking, checks and inserts did not finish in time. The transaction
    /// was rolled back before `COMMIT`, so nothing was written.
    #[error("Booking transaction timed out after {after_secs}s")]
    TransactionTimeout { after_secs: u64 },

    // =========================================================================
    // Payment Errors
    // =========================================================================
    #[error("Payment declined: {detail}")]
    PaymentDeclined { detail: String },

    /// The charge does not match the order total. Raised before the gateway
    /// is called.
    #[error("Payment amount {charged_cents} does not match order total {order_total_cents}")]
    PaymentAmountMismatch {
        charged_cents: i64,
        order_total_cents: i64,
    },

    #[error("Payment authorization timed out after {after_secs}s")]
    PaymentTimeout { after_secs: u64 },

    #[error("Payment gateway unavailable: {0}")]
    PaymentUnavailable(String),

    /// Payment was authorized but the order could not be written.
    ///
    /// Never retried automatically. The confirmation id is what operators
    /// reconcile against.
    #[error(
        "Payment received, order pending manual confirmation (payment confirmation {confirmation_id}): {source}"
    )]
    PostPaymentPersistence {
        confirmation_id: String,
        #[source]
        source: Box<BookingError>,
    },

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[source] DbError),
}

impl BookingError {
    pub fn invalid_cart(reason: impl Into<String>) -> Self {
        BookingError::InvalidCart {
            reason: reason.into(),
        }
    }

    /// Returns true if the same request may succeed when simply retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            BookingError::DuplicateFolio { .. }
            | BookingError::TransactionTimeout { .. }
            | BookingError::PaymentUnavailable(_) => true,
            BookingError::Database(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns true for errors caused by the request itself or by current
    /// stock and slot capacity. Nothing was written in these cases.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BookingError::InvalidCart { .. }
                | BookingError::InvalidComposition { .. }
                | BookingError::AddressRequired { .. }
                | BookingError::DateRangeRequired { .. }
                | BookingError::InvalidDateRange { .. }
                | BookingError::InsufficientInventory { .. }
                | BookingError::SlotFull { .. }
                | BookingError::ProductNotFound { .. }
                | BookingError::PaymentAmountMismatch { .. }
        )
    }

    /// Payment confirmation id carried by a post-payment failure.
    pub fn payment_confirmation(&self) -> Option<&str> {
        match self {
            BookingError::PostPaymentPersistence {
                confirmation_id, ..
            } => Some(confirmation_id),
            _ => None,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for BookingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCart { reason } => BookingError::InvalidCart { reason },
            CoreError::InvalidComposition { bundle_id, reason } => {
                BookingError::InvalidComposition { bundle_id, reason }
            }
            CoreError::AddressRequired { kind } => BookingError::AddressRequired { kind },
            CoreError::DateRangeRequired { field } => BookingError::DateRangeRequired { field },
            CoreError::InvalidDateRange { reason } => BookingError::InvalidDateRange { reason },
            CoreError::Validation(e) => BookingError::InvalidCart {
                reason: e.to_string(),
            },
        }
    }
}

impl From<DbError> for BookingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InvalidData(core) => core.into(),
            other => BookingError::Database(other),
        }
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<std::io::Error> for BookingError {
    fn from(err: std::io::Error) -> Self {
        BookingError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for BookingError {
    fn from(err: toml::de::Error) -> Self {
        BookingError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for BookingError {
    fn from(err: toml::ser::Error) -> Self {
        BookingError::Config(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
