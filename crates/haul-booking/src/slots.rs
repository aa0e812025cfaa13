//! # Slot Capacity Checker
//!
//! Deliveries and pickups are capped per calendar day, independently of
//! inventory. An order can have stock and still be refused for lack of a
//! delivery slot.
//!
//! ```text
//!   has_capacity(date, Delivery)
//!        │
//!        ▼
//!   SELECT COUNT(*) FROM orders WHERE delivery_date = date   (any status)
//!        │
//!        ▼
//!   count < daily_slot_cap ?
//! ```

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::debug;

use haul_core::availability::DateWindow;
use haul_core::slots::{self, DaySlots};
use haul_core::SlotKind;
use haul_db::{Database, OrderRepository};

use crate::error::{BookingError, BookingResult};

/// Longest range the calendar view will project in one call.
pub const MAX_CALENDAR_DAYS: i64 = 366;

#[derive(Debug, Clone)]
pub struct SlotCapacityChecker {
    db: Database,
    cap: i64,
}

impl SlotCapacityChecker {
    pub fn new(db: Database, cap: i64) -> Self {
        SlotCapacityChecker { db, cap }
    }

    pub fn cap(&self) -> i64 {
        self.cap
    }

    /// Whether one more order can be scheduled for `kind` on `date`.
    pub async fn has_capacity(&self, date: NaiveDate, kind: SlotKind) -> BookingResult<bool> {
        let count = self.db.orders().count_slot(kind, date).await?;
        Ok(slots::has_capacity(count, self.cap))
    }

    /// Fails with `SlotFull` when the day is taken. Runs on the caller's
    /// transaction.
    pub async fn ensure_capacity_on(
        &self,
        conn: &mut SqliteConnection,
        date: NaiveDate,
        kind: SlotKind,
    ) -> BookingResult<()> {
        let count = OrderRepository::count_slot_on(conn, kind, date).await?;
        debug!(%date, %kind, count, cap = self.cap, "Slot checked");

        if slots::has_capacity(count, self.cap) {
            Ok(())
        } else {
            Err(BookingError::SlotFull {
                date,
                kind,
                cap: self.cap,
            })
        }
    }

    /// Per-day slot usage for `[start, end]`.
    ///
    /// Read-only; free counts saturate at zero.
    pub async fn calendar(&self, start: NaiveDate, end: NaiveDate) -> BookingResult<Vec<DaySlots>> {
        let window = DateWindow::new(start, end)?;
        if window.days() > MAX_CALENDAR_DAYS {
            return Err(BookingError::InvalidDateRange {
                reason: format!(
                    "calendar covers {} days, maximum is {}",
                    window.days(),
                    MAX_CALENDAR_DAYS
                ),
            });
        }

        let (deliveries, pickups) = self.db.orders().slot_counts(&window).await?;
        Ok(slots::project_calendar(&window, &deliveries, &pickups, self.cap))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
