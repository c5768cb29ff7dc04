//! Stock allocation tests
//!
//! Property-based and unit tests for the FIFO allocation planner:
//! draws cover the request exactly, packaged stock is exhausted before
//! bulk stock, and insufficient stock never yields a partial plan.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use agrostock_backend::services::allocation::{plan_draws, StockCandidate};
use shared::models::StockSource;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn candidates(quantities: &[&str]) -> Vec<StockCandidate> {
    quantities
        .iter()
        .map(|q| StockCandidate::new(Uuid::new_v4(), dec(q)))
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

mod unit_tests {
    use super::*;

    /// Older lots are drained before newer ones
    #[test]
    fn test_fifo_order_respected() {
        let packaged = candidates(&["10", "20", "30"]);
        let draws = plan_draws(&packaged, &[], dec("25")).unwrap();

        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].quantity, dec("10"));
        assert_eq!(draws[1].quantity, dec("15"));
        assert_eq!(
            draws[0].source,
            StockSource::Packaged {
                lot_detail_id: packaged[0].id
            }
        );
    }

    /// Bulk stock is only touched once packaged stock is gone
    #[test]
    fn test_bulk_only_after_packaged() {
        let packaged = candidates(&["2", "3"]);
        let bulk = candidates(&["100"]);
        let draws = plan_draws(&packaged, &bulk, dec("10")).unwrap();

        assert_eq!(draws.len(), 3);
        assert!(matches!(draws[0].source, StockSource::Packaged { .. }));
        assert!(matches!(draws[1].source, StockSource::Packaged { .. }));
        assert!(matches!(draws[2].source, StockSource::Bulk { .. }));
        assert_eq!(draws[2].quantity, dec("5"));
    }

    /// A request for everything available succeeds with no leftover
    #[test]
    fn test_exact_total_is_allocatable() {
        let packaged = candidates(&["1.5", "2.5"]);
        let bulk = candidates(&["6"]);
        let draws = plan_draws(&packaged, &bulk, dec("10")).unwrap();
        let total: Decimal = draws.iter().map(|d| d.quantity).sum();
        assert_eq!(total, dec("10"));
    }

    /// One unit more than the total is rejected with the true availability
    #[test]
    fn test_one_over_total_is_rejected() {
        let packaged = candidates(&["1.5", "2.5"]);
        let bulk = candidates(&["6"]);
        let available = plan_draws(&packaged, &bulk, dec("11")).unwrap_err();
        assert_eq!(available, dec("10"));
    }

    /// No stock at all
    #[test]
    fn test_empty_candidates_rejected() {
        let available = plan_draws(&[], &[], dec("1")).unwrap_err();
        assert_eq!(available, Decimal::ZERO);
    }

    /// Fractional quantities allocate like any other
    #[test]
    fn test_fractional_quantities() {
        let packaged = candidates(&["0.75"]);
        let bulk = candidates(&["1.5"]);
        let draws = plan_draws(&packaged, &bulk, dec("1.25")).unwrap();

        assert_eq!(draws[0].quantity, dec("0.75"));
        assert_eq!(draws[1].quantity, dec("0.5"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    // Quantities with up to 3 decimal places, 0.001 .. 1000.000
    (1i64..=1_000_000).prop_map(|n| Decimal::new(n, 3))
}

fn candidate_strategy(max_len: usize) -> impl Strategy<Value = Vec<StockCandidate>> {
    prop::collection::vec(quantity_strategy(), 0..=max_len).prop_map(|quantities| {
        quantities
            .into_iter()
            .map(|q| StockCandidate::new(Uuid::new_v4(), q))
            .collect()
    })
}

proptest! {
    /// A successful plan always covers the request exactly
    #[test]
    fn prop_draws_conserve_requested(
        packaged in candidate_strategy(8),
        bulk in candidate_strategy(8),
        requested in quantity_strategy()
    ) {
        let available: Decimal = packaged
            .iter()
            .chain(bulk.iter())
            .map(|c| c.available)
            .sum();

        match plan_draws(&packaged, &bulk, requested) {
            Ok(draws) => {
                let total: Decimal = draws.iter().map(|d| d.quantity).sum();
                prop_assert_eq!(total, requested);
                prop_assert!(available >= requested);
            }
            Err(reported) => {
                prop_assert_eq!(reported, available);
                prop_assert!(available < requested);
            }
        }
    }

    /// No draw exceeds its candidate's availability and none is zero
    #[test]
    fn prop_draws_within_candidate_bounds(
        packaged in candidate_strategy(8),
        bulk in candidate_strategy(8),
        requested in quantity_strategy()
    ) {
        if let Ok(draws) = plan_draws(&packaged, &bulk, requested) {
            for draw in &draws {
                prop_assert!(draw.quantity > Decimal::ZERO);
                let candidate = packaged
                    .iter()
                    .chain(bulk.iter())
                    .find(|c| match draw.source {
                        StockSource::Packaged { lot_detail_id } => c.id == lot_detail_id,
                        StockSource::Bulk { bulk_conversion_id } => c.id == bulk_conversion_id,
                    })
                    .expect("draw references a known candidate");
                prop_assert!(draw.quantity <= candidate.available);
            }
        }
    }

    /// Packaged draws always come before bulk draws in the plan
    #[test]
    fn prop_packaged_before_bulk(
        packaged in candidate_strategy(8),
        bulk in candidate_strategy(8),
        requested in quantity_strategy()
    ) {
        if let Ok(draws) = plan_draws(&packaged, &bulk, requested) {
            let first_bulk = draws
                .iter()
                .position(|d| matches!(d.source, StockSource::Bulk { .. }));
            if let Some(first_bulk) = first_bulk {
                for draw in &draws[first_bulk..] {
                    prop_assert!(
                        matches!(draw.source, StockSource::Bulk { .. }),
                        "expected bulk source after first bulk draw"
                    );
                }
            }
        }
    }

    /// Every draw but the last exhausts its candidate (FIFO takes whole
    /// rows until the remainder fits in one)
    #[test]
    fn prop_all_but_last_draw_exhaust_their_source(
        packaged in candidate_strategy(8),
        bulk in candidate_strategy(8),
        requested in quantity_strategy()
    ) {
        if let Ok(draws) = plan_draws(&packaged, &bulk, requested) {
            for draw in draws.iter().rev().skip(1) {
                let candidate = packaged
                    .iter()
                    .chain(bulk.iter())
                    .find(|c| match draw.source {
                        StockSource::Packaged { lot_detail_id } => c.id == lot_detail_id,
                        StockSource::Bulk { bulk_conversion_id } => c.id == bulk_conversion_id,
                    })
                    .expect("draw references a known candidate");
                prop_assert_eq!(draw.quantity, candidate.available);
            }
        }
    }
}
