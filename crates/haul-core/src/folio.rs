//! # Folio Generation
//!
//! Folios are the only order identifier shown outside the engine:
//!
//! ```text
//!   GH-20240601-142233-9F3A1C
//!   ── ──────── ────── ──────
//!   │     │       │      └── 6 hex chars from a random UUID v4
//!   │     │       └───────── UTC time (HHMMSS)
//!   │     └───────────────── UTC date (YYYYMMDD)
//!   └─────────────────────── brand prefix
//! ```
//!
//! Uniqueness is enforced by the database, not here. A collision shows up
//! as a UNIQUE violation on insert and is retried with a fresh folio.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Prefix of every folio.
pub const FOLIO_PREFIX: &str = "GH";

const SUFFIX_LEN: usize = 6;

/// Generates a folio for an order booked at `now`.
pub fn generate_folio(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format_folio(now, &suffix[..SUFFIX_LEN])
}

/// Formats a folio from a timestamp and an explicit suffix.
pub fn format_folio(now: DateTime<Utc>, suffix: &str) -> String {
    format!(
        "{}-{}-{}",
        FOLIO_PREFIX,
        now.format("%Y%m%d-%H%M%S"),
        suffix.to_uppercase()
    )
}
