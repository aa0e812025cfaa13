//! # Availability Checker
//!
//! Answers "can `quantity` units of this leaf product go out between these
//! dates?" against the reservation ledger.
//!
//! ## Check Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product_id, quantity, [start, end]                                    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  stock     ← products.stock                                            │
//! │  reserved  ← Σ active reservations whose stored window overlaps        │
//! │              (stored end already includes the cleaning day)            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  remaining = stock − reserved     available = remaining ≥ quantity     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pool-bound methods are read-only previews. The orchestrator calls
//! the `*_on` variants with its own transaction after it has taken the
//! booking lock, so the read and the reservation write are serialized.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use haul_core::availability::{Availability, DateWindow};
use haul_db::{ProductRepository, ReservationRepository};

use crate::error::{BookingError, BookingResult};

/// One leaf product that cannot cover its requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortage {
    pub product_id: i64,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

impl From<Shortage> for BookingError {
    fn from(s: Shortage) -> Self {
        BookingError::InsufficientInventory {
            product_id: s.product_id,
            product_name: s.product_name,
            requested: s.requested,
            available: s.available,
        }
    }
}

/// Date-scoped stock checks against the reservation ledger.
#[derive(Debug, Clone)]
pub struct AvailabilityChecker {
    pool: SqlitePool,
}

impl AvailabilityChecker {
    pub fn new(pool: SqlitePool) -> Self {
        AvailabilityChecker { pool }
    }

    /// Checks one product for `[date_start, date_end]`.
    pub async fn is_available(
        &self,
        product_id: i64,
        quantity: i64,
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> BookingResult<Availability> {
        let window = DateWindow::new(date_start, date_end)?;
        let mut conn = self.pool.acquire().await?;
        Self::check_on(&mut conn, product_id, quantity, &window).await
    }

    /// Every shortage across an expanded cart, outside any transaction.
    pub async fn shortages(
        &self,
        needs: &BTreeMap<i64, i64>,
        window: &DateWindow,
    ) -> BookingResult<Vec<Shortage>> {
        let mut conn = self.pool.acquire().await?;
        Self::shortages_on(&mut conn, needs, window).await
    }

    // =========================================================================
    // Connection-scoped checks (run inside the caller's transaction)
    // =========================================================================

    pub async fn check_on(
        conn: &mut SqliteConnection,
        product_id: i64,
        quantity: i64,
        window: &DateWindow,
    ) -> BookingResult<Availability> {
        let stock = ProductRepository::stock_on(conn, product_id)
            .await?
            .ok_or(BookingError::ProductNotFound { product_id })?;
        let reserved = ReservationRepository::reserved_quantity_on(conn, product_id, window).await?;

        let availability = Availability::assess(stock, reserved, quantity);
        debug!(
            product_id,
            quantity,
            stock,
            reserved,
            remaining = availability.remaining,
            available = availability.available,
            "Availability checked"
        );
        Ok(availability)
    }

    /// Checks every leaf of an expanded cart and collects those that fall
    /// short. Leaves are visited in id order.
    pub async fn shortages_on(
        conn: &mut SqliteConnection,
        needs: &BTreeMap<i64, i64>,
        window: &DateWindow,
    ) -> BookingResult<Vec<Shortage>> {
        let mut shortages = Vec::new();

        for (&product_id, &requested) in needs {
            let product = ProductRepository::get_on(conn, product_id)
                .await?
                .ok_or(BookingError::ProductNotFound { product_id })?;
            let reserved =
                ReservationRepository::reserved_quantity_on(conn, product_id, window).await?;
            let availability = Availability::assess(product.stock, reserved, requested);

            if !availability.available {
                shortages.push(Shortage {
                    product_id,
                    product_name: product.name,
                    requested,
                    available: availability.remaining.max(0),
                });
            }
        }

        Ok(shortages)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
