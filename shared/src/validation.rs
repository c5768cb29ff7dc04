//! Validation utilities for the AgroStock platform
//!
//! Pure checks over quantities, prices and stock movements; the backend
//! maps failures onto its bilingual error responses.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places stock quantities are stored at
pub const QUANTITY_SCALE: u32 = 3;

/// Decimal places money amounts are stored at
pub const MONEY_SCALE: u32 = 2;

/// Validate a sale or allocation quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than 0");
    }
    Ok(())
}

/// Validate a unit price is strictly positive
pub fn validate_positive_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::ZERO {
        return Err("Unit price must be greater than 0");
    }
    Ok(())
}

/// Reject quantities finer than the storage scale
///
/// Quantity columns hold 3 decimal places; a finer quantity would be
/// rounded on write, so the recorded movement and the applied deduction
/// would disagree.
pub fn validate_quantity_scale(quantity: Decimal) -> Result<(), &'static str> {
    if quantity != quantity.round_dp(QUANTITY_SCALE) {
        return Err("Quantity cannot have more than 3 decimal places");
    }
    Ok(())
}

/// Reject prices finer than the currency scale (2 decimal places)
pub fn validate_price_scale(price: Decimal) -> Result<(), &'static str> {
    if price != price.round_dp(MONEY_SCALE) {
        return Err("Unit price cannot have more than 2 decimal places");
    }
    Ok(())
}

/// Validate a bulk conversion factor (bulk units yielded per packaged unit)
pub fn validate_conversion_factor(factor: Decimal) -> Result<(), &'static str> {
    if factor <= Decimal::ZERO {
        return Err("Conversion factor must be greater than 0");
    }
    Ok(())
}

/// Validate the number of packaged units to open into bulk
pub fn validate_units_to_open(units: Decimal) -> Result<(), &'static str> {
    if units <= Decimal::ZERO {
        return Err("Units to open must be greater than 0");
    }
    Ok(())
}

/// Total loose quantity yielded by opening packaged units
///
/// Rounded to the quantity storage scale, half away from zero, so the
/// in-code value equals what the database keeps in `remaining_bulk`.
pub fn bulk_quantity(units_to_open: Decimal, conversion_factor: Decimal) -> Decimal {
    (units_to_open * conversion_factor)
        .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Line total for a sale line
///
/// Rounded to the currency scale, half away from zero, matching how the
/// `line_total` column rounds on insert.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    (quantity * unit_price)
        .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Check a cancellation restore stays within the received quantity
///
/// A restore that would push `quantity_available` past `quantity_received`
/// indicates a prior accounting bug; callers must surface it rather than
/// clamp.
pub fn validate_restore_within_received(
    quantity_available: Decimal,
    restore: Decimal,
    quantity_received: Decimal,
) -> Result<(), &'static str> {
    if quantity_available + restore > quantity_received {
        return Err("Restore would exceed the quantity originally received");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_positive_quantity() {
        assert!(validate_positive_quantity(dec("0.5")).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(dec("-1")).is_err());
    }

    #[test]
    fn test_positive_price() {
        assert!(validate_positive_price(dec("2.50")).is_ok());
        assert!(validate_positive_price(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_bulk_quantity_arithmetic() {
        // Opening 2 bags at 25kg each yields 50kg of loose stock
        assert_eq!(bulk_quantity(dec("2"), dec("25")), dec("50"));
    }

    #[test]
    fn test_line_total_arithmetic() {
        assert_eq!(line_total(dec("4"), dec("2.50")), dec("10.00"));
    }

    #[test]
    fn test_line_total_rounds_half_away_from_zero() {
        // 0.5 * 2.55 = 1.275, stored as 1.28
        assert_eq!(line_total(dec("0.5"), dec("2.55")), dec("1.28"));
    }

    #[test]
    fn test_quantity_scale() {
        assert!(validate_quantity_scale(dec("0.005")).is_ok());
        assert!(validate_quantity_scale(dec("2.5000")).is_ok());
        assert!(validate_quantity_scale(dec("0.0005")).is_err());
    }

    #[test]
    fn test_price_scale() {
        assert!(validate_price_scale(dec("2.55")).is_ok());
        assert!(validate_price_scale(dec("2.555")).is_err());
    }

    #[test]
    fn test_bulk_quantity_quantized_to_storage_scale() {
        assert_eq!(bulk_quantity(dec("0.005"), dec("0.5")), dec("0.003"));
    }

    #[test]
    fn test_restore_bound() {
        assert!(validate_restore_within_received(dec("6"), dec("4"), dec("10")).is_ok());
        assert!(validate_restore_within_received(dec("6"), dec("5"), dec("10")).is_err());
    }

    proptest! {
        #[test]
        fn prop_line_total_is_rounded_product(
            q in 1i64..=10_000,
            p in 1i64..=100_000
        ) {
            let quantity = Decimal::new(q, 1);
            let price = Decimal::new(p, 2);
            let total = line_total(quantity, price);
            prop_assert!(total > Decimal::ZERO);
            prop_assert_eq!(
                total,
                (quantity * price)
                    .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
            );
            // Never off by more than half a cent from the exact product
            prop_assert!((total - quantity * price).abs() <= Decimal::new(5, 3));
        }

        #[test]
        fn prop_restore_never_valid_past_received(
            received in 1i64..=10_000,
            over in 1i64..=1_000
        ) {
            let received = Decimal::from(received);
            let available = received; // already full
            let restore = Decimal::from(over);
            prop_assert!(
                validate_restore_within_received(available, restore, received).is_err()
            );
        }
    }
}
