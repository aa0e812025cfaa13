//! # Validation Module
//!
//! Input validation for booking requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront                                                   │
//! │  ├── Date pickers, required fields                                     │
//! │  └── Availability / calendar pre-checks                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any transaction is opened)               │
//! │  ├── Cart shape: lines, names, quantities, prices                      │
//! │  ├── Dates present and ordered                                         │
//! │  └── Addresses present                                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Orchestrator transaction                                     │
//! │  ├── Inventory and slot re-checks                                      │
//! │  └── UNIQUE folio, FK and CHECK constraints                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use haul_core::validation::{validate_cart, validate_quantity};
//! use haul_core::CartItem;
//!
//! validate_quantity(5).unwrap();
//! validate_cart(&[CartItem::new(1, "Caja mediana", 10, 2500)], 100).unwrap();
//! ```

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::CartItem;
use crate::MAX_ITEM_QUANTITY;

/// Result type for field-level validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a cart line name.
///
/// ## Rules
/// - Must not be blank
/// - At most 255 characters (the `order_items.product_name` column)
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 255 {
        return Err(ValidationError::InvalidFormat {
            field: "name".to_string(),
            reason: "must be at most 255 characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or total in centavos. Zero is allowed.
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Cart
// =============================================================================

/// Validates the shape of a cart before it reaches the resolver.
///
/// ## Rules
/// - At least one line, at most `max_items`
/// - Every line has a name, a quantity in `1..=999` and a non-negative price
///
/// ## Errors
/// `InvalidCart`, naming the offending line (1-based) and field.
pub fn validate_cart(items: &[CartItem], max_items: usize) -> CoreResult<()> {
    if items.is_empty() {
        return Err(CoreError::invalid_cart("cart is empty"));
    }

    if items.len() > max_items {
        return Err(CoreError::invalid_cart(format!(
            "cart has {} lines, maximum is {}",
            items.len(),
            max_items
        )));
    }

    for (idx, item) in items.iter().enumerate() {
        let line = idx + 1;
        validate_item_name(&item.name)
            .and_then(|_| validate_quantity(item.quantity))
            .and_then(|_| validate_amount_cents("price", item.price_cents))
            .map_err(|e| CoreError::invalid_cart(format!("line {}: {}", line, e)))?;
    }

    Ok(())
}

// =============================================================================
// Dates
// =============================================================================

/// The four dates of a booking, all present and checked for order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalDates {
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub delivery_date: NaiveDate,
    pub pickup_date: NaiveDate,
}

/// Requires every booking date and checks their ordering.
///
/// ## Rules
/// - All four dates must be present (`DateRangeRequired`)
/// - `date_start <= date_end`
/// - `delivery_date <= pickup_date`
pub fn validate_rental_dates(
    date_start: Option<NaiveDate>,
    date_end: Option<NaiveDate>,
    delivery_date: Option<NaiveDate>,
    pickup_date: Option<NaiveDate>,
) -> CoreResult<RentalDates> {
    let date_start = required_date("date_start", date_start)?;
    let date_end = required_date("date_end", date_end)?;
    let delivery_date = required_date("delivery_date", delivery_date)?;
    let pickup_date = required_date("pickup_date", pickup_date)?;

    if date_end < date_start {
        return Err(CoreError::InvalidDateRange {
            reason: format!("date_end {} is before date_start {}", date_end, date_start),
        });
    }

    if pickup_date < delivery_date {
        return Err(CoreError::InvalidDateRange {
            reason: format!(
                "pickup_date {} is before delivery_date {}",
                pickup_date, delivery_date
            ),
        });
    }

    Ok(RentalDates {
        date_start,
        date_end,
        delivery_date,
        pickup_date,
    })
}

fn required_date(field: &str, value: Option<NaiveDate>) -> CoreResult<NaiveDate> {
    value.ok_or_else(|| CoreError::DateRangeRequired {
        field: field.to_string(),
    })
}

// =============================================================================
// Addresses
// =============================================================================

/// Requires both address references. Contents are never inspected.
pub fn validate_addresses(delivery: Option<i64>, pickup: Option<i64>) -> CoreResult<(i64, i64)> {
    let delivery = delivery.ok_or_else(|| CoreError::AddressRequired {
        kind: "Delivery".to_string(),
    })?;
    let pickup = pickup.ok_or_else(|| CoreError::AddressRequired {
        kind: "Pickup".to_string(),
    })?;
    Ok((delivery, pickup))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_empty_cart_is_invalid() {
        let err = validate_cart(&[], 100).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCart { .. }));
    }

    #[test]
    fn test_cart_line_errors_name_the_line() {
        let items = [
            CartItem::new(1, "Caja mediana", 2, 2500),
            CartItem::new(2, "   ", 1, 2500),
        ];
        let err = validate_cart(&items, 100).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let items = [CartItem::new(1, "Caja mediana", 2, -1)];
        let err = validate_cart(&items, 100).unwrap_err();
        assert!(err.to_string().contains("price"));

        let items = [CartItem::new(1, "Caja mediana", 0, 2500)];
        assert!(validate_cart(&items, 100).is_err());
    }

    #[test]
    fn test_free_items_are_allowed() {
        let items = [CartItem::new(9, "Cinta de regalo", 1, 0)];
        assert!(validate_cart(&items, 100).is_ok());
    }

    #[test]
    fn test_cart_line_limit() {
        let items = vec![CartItem::new(1, "Caja", 1, 100); 3];
        assert!(validate_cart(&items, 3).is_ok());
        assert!(validate_cart(&items, 2).is_err());
    }

    #[test]
    fn test_missing_dates_are_reported_by_field() {
        let err = validate_rental_dates(Some(d("2024-06-01")), None, None, None).unwrap_err();
        match err {
            CoreError::DateRangeRequired { field } => assert_eq!(field, "date_end"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_dates_must_be_ordered() {
        let reversed = validate_rental_dates(
            Some(d("2024-06-03")),
            Some(d("2024-06-01")),
            Some(d("2024-06-01")),
            Some(d("2024-06-03")),
        );
        assert!(matches!(reversed, Err(CoreError::InvalidDateRange { .. })));

        let ok = validate_rental_dates(
            Some(d("2024-06-01")),
            Some(d("2024-06-03")),
            Some(d("2024-06-01")),
            Some(d("2024-06-03")),
        )
        .unwrap();
        assert_eq!(ok.pickup_date, d("2024-06-03"));
    }

    #[test]
    fn test_addresses_required() {
        assert!(matches!(
            validate_addresses(None, Some(2)),
            Err(CoreError::AddressRequired { .. })
        ));
        assert_eq!(validate_addresses(Some(1), Some(2)).unwrap(), (1, 2));
    }
}
