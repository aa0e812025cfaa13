//! # Error Types
//!
//! Domain-specific error types for haul-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  haul-core errors (this file)                                          │
//! │  ├── CoreError        - Cart, composition and date rule violations     │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  haul-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  haul-booking errors                                                   │
//! │  └── BookingError     - What callers see (full booking taxonomy)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → BookingError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule violations.
///
/// Every variant is detected before any durable write happens.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The cart cannot be booked as submitted.
    ///
    /// ## When This Occurs
    /// - Empty cart
    /// - A line with a blank name, a non-positive quantity or a negative price
    /// - More lines than the configured maximum
    #[error("Invalid cart: {reason}")]
    InvalidCart { reason: String },

    /// A bundle is referenced that has no usable composition.
    ///
    /// ## When This Occurs
    /// - Product is marked as a bundle but no components are registered
    /// - A composition lists another bundle as a component (nesting)
    #[error("Invalid composition for bundle {bundle_id}: {reason}")]
    InvalidComposition { bundle_id: i64, reason: String },

    /// Delivery or pickup address is missing.
    #[error("{kind} address is required")]
    AddressRequired { kind: String },

    /// Rental dates or delivery/pickup dates are missing.
    #[error("{field} is required")]
    DateRangeRequired { field: String },

    /// Dates are present but out of order.
    #[error("Invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn invalid_cart(reason: impl Into<String>) -> Self {
        CoreError::InvalidCart {
            reason: reason.into(),
        }
    }

    pub fn invalid_composition(bundle_id: i64, reason: impl Into<String>) -> Self {
        CoreError::InvalidComposition {
            bundle_id,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a single field doesn't meet requirements.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
