//! # Availability Arithmetic
//!
//! Pure date-range and stock math behind the availability checker.
//!
//! ## Cleaning Buffer
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Customer rental  06-01 ─────── 06-03   (return date D)                 │
//! │  Stored window    06-01 ─────────────── 06-04   (D + cleaning day)      │
//! │                                                                         │
//! │  New booking starting 06-04 → overlaps   → units unavailable            │
//! │  New booking starting 06-05 → no overlap → units available again        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The buffer is added once, when a reservation is written. Matching
//! compares the stored end date directly, with inclusive overlap: two
//! windows overlap unless one ends strictly before the other begins.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateWindow {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateWindow {
    /// Creates a window, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::InvalidDateRange {
                reason: format!("end {} is before start {}", end, start),
            });
        }
        Ok(DateWindow { start, end })
    }

    /// Inclusive overlap test.
    #[inline]
    pub fn overlaps(&self, other: &DateWindow) -> bool {
        !(self.end < other.start || other.end < self.start)
    }

    /// The window as stored in the ledger: end pushed out by the cleaning days.
    pub fn with_cleaning(&self, cleaning_days: u64) -> DateWindow {
        DateWindow {
            start: self.start,
            end: extend_for_cleaning(self.end, cleaning_days),
        }
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Iterates every day of the window in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Adds the cleaning buffer to a return date.
///
/// Saturates at the calendar maximum instead of panicking.
pub fn extend_for_cleaning(end: NaiveDate, cleaning_days: u64) -> NaiveDate {
    end.checked_add_days(Days::new(cleaning_days))
        .unwrap_or(NaiveDate::MAX)
}

/// Result of an availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Availability {
    pub available: bool,
    /// `stock − reserved`; may be negative if stock was lowered after booking.
    pub remaining: i64,
}

impl Availability {
    /// `remaining = stock − reserved`, `available = remaining >= requested`.
    ///
    /// ## Example
    /// ```rust
    /// use haul_core::availability::Availability;
    ///
    /// let a = Availability::assess(10, 6, 5);
    /// assert_eq!(a.remaining, 4);
    /// assert!(!a.available);
    /// ```
    pub fn assess(stock: i64, reserved: i64, requested: i64) -> Self {
        let remaining = stock - reserved;
        Availability {
            available: remaining >= requested,
            remaining,
        }
    }
}

/// Sums quantities of windows that overlap `requested`.
///
/// In-memory counterpart of the ledger query, used where reservations are
/// already loaded.
pub fn reserved_in_window<'a, I>(reservations: I, requested: &DateWindow) -> i64
where
    I: IntoIterator<Item = (&'a DateWindow, i64)>,
{
    reservations
        .into_iter()
        .filter(|(window, _)| window.overlaps(requested))
        .map(|(_, qty)| qty)
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
