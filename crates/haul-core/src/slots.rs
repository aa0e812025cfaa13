//! # Slot Arithmetic
//!
//! Each calendar day has a fixed number of delivery slots and, separately,
//! the same number of pickup slots. A slot is taken by any order whose
//! delivery (or pickup) date is that day, whatever the order's status.
//!
//! ```text
//!   date        deliveries  pickups   free (cap = 3)
//!   ──────────  ──────────  ───────   ──────────────
//!   2024-06-01       3          1      0 / 2
//!   2024-06-02       0          3      3 / 0
//!   2024-06-03       4*         0      0 / 3      * over cap, saturates
//! ```

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::availability::DateWindow;

/// `true` while `count` is strictly below `cap`.
#[inline]
pub fn has_capacity(count: i64, cap: i64) -> bool {
    count < cap
}

/// One row of the slot calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DaySlots {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub deliveries: i64,
    pub pickups: i64,
    pub deliveries_available: i64,
    pub pickups_available: i64,
}

impl DaySlots {
    pub fn new(date: NaiveDate, deliveries: i64, pickups: i64, cap: i64) -> Self {
        DaySlots {
            date,
            deliveries,
            pickups,
            deliveries_available: (cap - deliveries).max(0),
            pickups_available: (cap - pickups).max(0),
        }
    }
}

/// Projects per-day counts onto every day of `window`.
///
/// Days absent from either map count as zero.
pub fn project_calendar(
    window: &DateWindow,
    deliveries: &HashMap<NaiveDate, i64>,
    pickups: &HashMap<NaiveDate, i64>,
    cap: i64,
) -> Vec<DaySlots> {
    window
        .iter_days()
        .map(|day| {
            DaySlots::new(
                day,
                deliveries.get(&day).copied().unwrap_or(0),
                pickups.get(&day).copied().unwrap_or(0),
                cap,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DAILY_SLOT_CAP;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_fourth_slot_is_refused() {
        assert!(has_capacity(2, DAILY_SLOT_CAP));
        assert!(!has_capacity(3, DAILY_SLOT_CAP));
        assert!(!has_capacity(4, DAILY_SLOT_CAP));
    }

    #[test]
    fn test_calendar_projection() {
        let window = DateWindow::new(d("2024-06-01"), d("2024-06-03")).unwrap();
        let deliveries = HashMap::from([(d("2024-06-01"), 3), (d("2024-06-03"), 4)]);
        let pickups = HashMap::from([(d("2024-06-01"), 1), (d("2024-06-02"), 3)]);

        let calendar = project_calendar(&window, &deliveries, &pickups, DAILY_SLOT_CAP);

        assert_eq!(calendar.len(), 3);
        assert_eq!(calendar[0], DaySlots::new(d("2024-06-01"), 3, 1, 3));
        assert_eq!(calendar[0].pickups_available, 2);
        assert_eq!(calendar[1].deliveries_available, 3);
        assert_eq!(calendar[1].pickups_available, 0);
        assert_eq!(calendar[2].deliveries, 4);
        assert_eq!(calendar[2].deliveries_available, 0);
    }
}
