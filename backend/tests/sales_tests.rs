//! Sale commit and cancellation tests
//!
//! The commit engine applies an allocation plan as stock deductions and
//! sale lines; cancellation replays the lines in reverse as restores.
//! These tests drive that arithmetic over an in-memory stock ledger.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use agrostock_backend::services::allocation::{plan_draws, Draw, StockCandidate};
use shared::models::{SaleStatus, StockSource};
use shared::validation;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn candidates(quantities: &[&str]) -> Vec<StockCandidate> {
    quantities
        .iter()
        .map(|q| StockCandidate::new(Uuid::new_v4(), dec(q)))
        .collect()
}

fn source_id(draw: &Draw) -> Uuid {
    match draw.source {
        StockSource::Packaged { lot_detail_id } => lot_detail_id,
        StockSource::Bulk { bulk_conversion_id } => bulk_conversion_id,
    }
}

/// Apply a plan's deductions to an in-memory ledger, the way the commit
/// engine applies them to locked rows. Draws against rows outside this
/// ledger are left for the other ledger.
fn apply_draws(ledger: &mut [StockCandidate], draws: &[Draw]) {
    for draw in draws {
        let id = source_id(draw);
        if let Some(row) = ledger.iter_mut().find(|c| c.id == id) {
            row.available -= draw.quantity;
        }
    }
}

/// Restore a plan's deductions, the way cancellation replays sale lines
fn restore_draws(ledger: &mut [StockCandidate], draws: &[Draw]) {
    for draw in draws {
        let id = source_id(draw);
        if let Some(row) = ledger.iter_mut().find(|c| c.id == id) {
            row.available += draw.quantity;
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

mod unit_tests {
    use super::*;

    /// Selling 4 units at 2.50 produces a 10.00 line
    #[test]
    fn test_line_total() {
        assert_eq!(validation::line_total(dec("4"), dec("2.50")), dec("10.00"));
    }

    /// A sale spanning two lots yields one line per draw, and the lines
    /// sum to the requested quantity times the price
    #[test]
    fn test_multi_lot_sale_total() {
        let packaged = candidates(&["5", "5"]);
        let draws = plan_draws(&packaged, &[], dec("7")).unwrap();

        let unit_price = dec("3.00");
        let total: Decimal = draws
            .iter()
            .map(|d| validation::line_total(d.quantity, unit_price))
            .sum();

        assert_eq!(total, dec("21.00"));
    }

    /// Sub-cent draws: each stored line is rounded to the currency scale,
    /// and the sale total is the sum of those stored lines
    #[test]
    fn test_total_is_sum_of_rounded_lines() {
        let packaged = candidates(&["0.5", "0.5"]);
        let draws = plan_draws(&packaged, &[], dec("1")).unwrap();
        assert_eq!(draws.len(), 2);

        // 0.5 * 2.55 = 1.275, stored as 1.28 per line
        let unit_price = dec("2.55");
        let lines: Vec<Decimal> = draws
            .iter()
            .map(|d| validation::line_total(d.quantity, unit_price))
            .collect();
        assert_eq!(lines, vec![dec("1.28"), dec("1.28")]);

        // The total follows the stored lines (2.56), not the raw
        // quantity-times-price product (2.55)
        let total: Decimal = lines.iter().copied().sum();
        assert_eq!(total, dec("2.56"));
        assert_ne!(total, dec("1") * unit_price);
    }

    /// Quantities below the stored scale are rejected before allocation;
    /// applied at the database they would round back to no movement
    #[test]
    fn test_sub_scale_quantity_rejected() {
        assert!(validation::validate_quantity_scale(dec("0.0005")).is_err());
        assert!(validation::validate_quantity_scale(dec("0.005")).is_ok());
        assert!(validation::validate_price_scale(dec("2.555")).is_err());
    }

    /// Deducting then restoring a sale leaves the ledger untouched
    #[test]
    fn test_cancel_round_trips_stock() {
        let mut ledger = candidates(&["5", "5"]);
        let before = ledger.clone();

        let draws = plan_draws(&ledger, &[], dec("7")).unwrap();
        apply_draws(&mut ledger, &draws);
        assert_eq!(ledger[0].available, Decimal::ZERO);
        assert_eq!(ledger[1].available, dec("3"));

        restore_draws(&mut ledger, &draws);
        assert_eq!(ledger, before);
    }

    /// A failed allocation produces no draws, so nothing is applied
    #[test]
    fn test_insufficient_stock_changes_nothing() {
        let ledger = candidates(&["2"]);
        let before = ledger.clone();

        assert!(plan_draws(&ledger, &[], dec("5")).is_err());
        assert_eq!(ledger, before);
    }

    /// Only a completed sale may be cancelled
    #[test]
    fn test_cancelled_sale_cannot_cancel_again() {
        let status = SaleStatus::Cancelled;
        assert_ne!(status, SaleStatus::Completed);
        // The service refuses the second cancellation before any restore
        // runs; this pins the state check it relies on.
        assert_eq!(SaleStatus::from_str("cancelled"), Some(SaleStatus::Cancelled));
        assert_eq!(SaleStatus::default(), SaleStatus::Completed);
    }

    /// Restoring past the received quantity is an error, not a clamp
    #[test]
    fn test_over_restore_rejected() {
        // received 10, available already 8, restoring 3 would make 11
        assert!(validation::validate_restore_within_received(dec("8"), dec("3"), dec("10")).is_err());
        assert!(validation::validate_restore_within_received(dec("8"), dec("2"), dec("10")).is_ok());
    }

    /// Sale lines reference exactly one stock source
    #[test]
    fn test_sale_line_source_exclusivity() {
        let id = Uuid::new_v4();
        assert!(StockSource::from_columns(Some(id), None).is_ok());
        assert!(StockSource::from_columns(None, Some(id)).is_ok());
        assert!(StockSource::from_columns(None, None).is_err());
        assert!(StockSource::from_columns(Some(id), Some(id)).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000).prop_map(|n| Decimal::new(n, 3))
}

fn ledger_strategy(max_len: usize) -> impl Strategy<Value = Vec<StockCandidate>> {
    prop::collection::vec(quantity_strategy(), 1..=max_len).prop_map(|quantities| {
        quantities
            .into_iter()
            .map(|q| StockCandidate::new(Uuid::new_v4(), q))
            .collect()
    })
}

proptest! {
    /// Commit then cancel is the identity on stock
    #[test]
    fn prop_commit_cancel_round_trip(
        packaged in ledger_strategy(6),
        bulk in ledger_strategy(6),
        requested in quantity_strategy()
    ) {
        let mut packaged = packaged;
        let mut bulk = bulk;
        let packaged_before = packaged.clone();
        let bulk_before = bulk.clone();

        if let Ok(draws) = plan_draws(&packaged, &bulk, requested) {
            apply_draws(&mut packaged, &draws);
            apply_draws(&mut bulk, &draws);
            restore_draws(&mut packaged, &draws);
            restore_draws(&mut bulk, &draws);
        }

        prop_assert_eq!(packaged, packaged_before);
        prop_assert_eq!(bulk, bulk_before);
    }

    /// Stock is conserved across a commit: what left the ledger equals
    /// what the sale recorded
    #[test]
    fn prop_commit_conserves_stock(
        packaged in ledger_strategy(6),
        requested in quantity_strategy()
    ) {
        let mut ledger = packaged;
        let before: Decimal = ledger.iter().map(|c| c.available).sum();

        if let Ok(draws) = plan_draws(&ledger, &[], requested) {
            apply_draws(&mut ledger, &draws);
            let after: Decimal = ledger.iter().map(|c| c.available).sum();
            prop_assert_eq!(before - after, requested);
            prop_assert!(ledger.iter().all(|c| c.available >= Decimal::ZERO));
        }
    }

    /// The sale total equals the sum of its stored lines, and each line
    /// is within half a cent of the exact product
    #[test]
    fn prop_sale_total_is_sum_of_lines(
        packaged in ledger_strategy(6),
        requested in quantity_strategy(),
        price_cents in 1i64..=1_000_000
    ) {
        let unit_price = Decimal::new(price_cents, 2);

        if let Ok(draws) = plan_draws(&packaged, &[], requested) {
            let lines: Vec<Decimal> = draws
                .iter()
                .map(|d| validation::line_total(d.quantity, unit_price))
                .collect();
            let total: Decimal = lines.iter().copied().sum();

            let half_cent = Decimal::new(5, 3);
            for (line, draw) in lines.iter().zip(&draws) {
                prop_assert!((*line - draw.quantity * unit_price).abs() <= half_cent);
            }
            let max_drift = half_cent * Decimal::from(draws.len() as i64);
            prop_assert!((total - requested * unit_price).abs() <= max_drift);
        }
    }

    /// Apply-draws never drives a row negative
    #[test]
    fn prop_apply_never_negative(
        packaged in ledger_strategy(6),
        bulk in ledger_strategy(6),
        requested in quantity_strategy()
    ) {
        let mut packaged = packaged;
        let mut bulk = bulk;

        if let Ok(draws) = plan_draws(&packaged, &bulk, requested) {
            apply_draws(&mut packaged, &draws);
            apply_draws(&mut bulk, &draws);
            for row in packaged.iter().chain(bulk.iter()) {
                prop_assert!(row.available >= Decimal::ZERO);
            }
        }
    }
}
