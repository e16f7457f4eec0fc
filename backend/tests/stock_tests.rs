//! Stock ledger tests
//!
//! Tests for the movement engine semantics:
//! - clamping at zero on outbound movements
//! - the signed requested delta recorded in history
//! - replaying the ledger reproduces the stored quantity

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use shared::types::{MovementType, StockStatus};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory model of the movement engine: the same read-modify-write and
/// ledger-append the database transaction performs.
#[derive(Default)]
struct LedgerModel {
    stocks: HashMap<(u32, u32), Decimal>,
    history: Vec<LedgerEntry>,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    product: u32,
    warehouse: u32,
    delta: Decimal,
    before: Decimal,
    after: Decimal,
}

impl LedgerModel {
    fn apply(&mut self, product: u32, warehouse: u32, quantity: Decimal, movement: MovementType) {
        assert!(quantity >= Decimal::ZERO, "quantities are never negative");

        let key = (product, warehouse);
        let before = self.stocks.get(&key).copied().unwrap_or(Decimal::ZERO);
        let after = match movement {
            MovementType::In => before + quantity,
            MovementType::Out => Decimal::ZERO.max(before - quantity),
        };
        let delta = match movement {
            MovementType::In => quantity,
            MovementType::Out => -quantity,
        };

        self.stocks.insert(key, after);
        self.history.push(LedgerEntry {
            product,
            warehouse,
            delta,
            before,
            after,
        });
    }

    fn quantity(&self, product: u32, warehouse: u32) -> Decimal {
        self.stocks
            .get(&(product, warehouse))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Inbound movements add to the stored level
    #[test]
    fn test_inbound_adds() {
        let mut model = LedgerModel::default();
        model.apply(1, 1, dec("10"), MovementType::In);
        model.apply(1, 1, dec("5.5"), MovementType::In);

        assert_eq!(model.quantity(1, 1), dec("15.5"));
    }

    /// Outbound movements subtract but never go below zero
    #[test]
    fn test_outbound_clamps_at_zero() {
        let mut model = LedgerModel::default();
        model.apply(1, 1, dec("10"), MovementType::In);
        model.apply(1, 1, dec("25"), MovementType::Out);

        assert_eq!(model.quantity(1, 1), Decimal::ZERO);
    }

    /// An absent stock row reads as zero
    #[test]
    fn test_absent_row_is_zero() {
        let model = LedgerModel::default();
        assert_eq!(model.quantity(42, 7), Decimal::ZERO);
    }

    /// Outbound from an absent row stays at zero
    #[test]
    fn test_outbound_from_absent_row() {
        let mut model = LedgerModel::default();
        model.apply(1, 1, dec("8"), MovementType::Out);

        assert_eq!(model.quantity(1, 1), Decimal::ZERO);
        let entry = &model.history[0];
        assert_eq!(entry.before, Decimal::ZERO);
        assert_eq!(entry.after, Decimal::ZERO);
    }

    /// The ledger records the requested delta, not the clamped one
    #[test]
    fn test_clamped_movement_keeps_requested_delta() {
        let mut model = LedgerModel::default();
        model.apply(1, 1, dec("10"), MovementType::In);
        model.apply(1, 1, dec("25"), MovementType::Out);

        let entry = &model.history[1];
        assert_eq!(entry.delta, dec("-25"));
        assert_eq!(entry.before, dec("10"));
        assert_eq!(entry.after, Decimal::ZERO);
    }

    /// Before/after snapshots chain across consecutive movements
    #[test]
    fn test_history_snapshots_chain() {
        let mut model = LedgerModel::default();
        model.apply(1, 1, dec("100"), MovementType::In);
        model.apply(1, 1, dec("30"), MovementType::Out);
        model.apply(1, 1, dec("12"), MovementType::In);

        assert_eq!(model.history[0].before, dec("0"));
        assert_eq!(model.history[0].after, dec("100"));
        assert_eq!(model.history[1].before, dec("100"));
        assert_eq!(model.history[1].after, dec("70"));
        assert_eq!(model.history[2].before, dec("70"));
        assert_eq!(model.history[2].after, dec("82"));
    }

    /// Stock per (product, warehouse) pair is independent
    #[test]
    fn test_pairs_are_independent() {
        let mut model = LedgerModel::default();
        model.apply(1, 1, dec("10"), MovementType::In);
        model.apply(1, 2, dec("4"), MovementType::In);
        model.apply(2, 1, dec("7"), MovementType::In);
        model.apply(1, 1, dec("3"), MovementType::Out);

        assert_eq!(model.quantity(1, 1), dec("7"));
        assert_eq!(model.quantity(1, 2), dec("4"));
        assert_eq!(model.quantity(2, 1), dec("7"));
    }

    /// Stock status classification from quantity and reorder level
    #[test]
    fn test_stock_status_classification() {
        assert_eq!(
            StockStatus::classify(Decimal::ZERO, Some(dec("10"))),
            StockStatus::OutOfStock
        );
        assert_eq!(
            StockStatus::classify(dec("5"), Some(dec("10"))),
            StockStatus::LowStock
        );
        assert_eq!(
            StockStatus::classify(dec("10"), Some(dec("10"))),
            StockStatus::LowStock
        );
        assert_eq!(
            StockStatus::classify(dec("11"), Some(dec("10"))),
            StockStatus::InStock
        );
        assert_eq!(StockStatus::classify(dec("1"), None), StockStatus::InStock);
    }

    /// Movement type round-trips through its text form
    #[test]
    fn test_movement_type_round_trip() {
        for movement in [MovementType::In, MovementType::Out] {
            let text = movement.as_str();
            assert_eq!(text.parse::<MovementType>().unwrap(), movement);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=100000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn movement_strategy() -> impl Strategy<Value = MovementType> {
        prop_oneof![Just(MovementType::In), Just(MovementType::Out)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Stored quantity is never negative, whatever the movement sequence
        #[test]
        fn prop_quantity_never_negative(
            movements in prop::collection::vec((quantity_strategy(), movement_strategy()), 1..50)
        ) {
            let mut model = LedgerModel::default();
            for (quantity, movement) in movements {
                model.apply(1, 1, quantity, movement);
                prop_assert!(model.quantity(1, 1) >= Decimal::ZERO);
            }
        }

        /// Every history entry satisfies after == max(0, before + delta)
        #[test]
        fn prop_history_entries_consistent(
            movements in prop::collection::vec((quantity_strategy(), movement_strategy()), 1..50)
        ) {
            let mut model = LedgerModel::default();
            for (quantity, movement) in movements {
                model.apply(1, 1, quantity, movement);
            }
            for entry in &model.history {
                prop_assert_eq!(
                    entry.after,
                    Decimal::ZERO.max(entry.before + entry.delta)
                );
            }
        }

        /// Replaying the ledger from zero reproduces the stored quantity
        #[test]
        fn prop_replay_reproduces_stock(
            movements in prop::collection::vec(
                (0u32..3, 0u32..2, quantity_strategy(), movement_strategy()),
                1..80
            )
        ) {
            let mut model = LedgerModel::default();
            for (product, warehouse, quantity, movement) in movements {
                model.apply(product, warehouse, quantity, movement);
            }

            let mut replayed: HashMap<(u32, u32), Decimal> = HashMap::new();
            for entry in &model.history {
                let level = replayed
                    .entry((entry.product, entry.warehouse))
                    .or_insert(Decimal::ZERO);
                *level = Decimal::ZERO.max(*level + entry.delta);
            }

            for ((product, warehouse), quantity) in &model.stocks {
                prop_assert_eq!(
                    replayed.get(&(*product, *warehouse)).copied().unwrap_or(Decimal::ZERO),
                    *quantity
                );
            }
        }

        /// Without clamping, the ledger deltas sum to the stored quantity
        #[test]
        fn prop_unclamped_deltas_sum_to_stock(
            inbound in prop::collection::vec(quantity_strategy(), 1..20),
        ) {
            let mut model = LedgerModel::default();
            for quantity in &inbound {
                model.apply(1, 1, *quantity, MovementType::In);
            }

            let total: Decimal = model.history.iter().map(|e| e.delta).sum();
            prop_assert_eq!(total, model.quantity(1, 1));
        }

        /// An in followed by an equal out returns to the starting level
        #[test]
        fn prop_in_then_out_round_trip(
            start in quantity_strategy(),
            quantity in quantity_strategy(),
        ) {
            let mut model = LedgerModel::default();
            model.apply(1, 1, start, MovementType::In);
            model.apply(1, 1, quantity, MovementType::In);
            model.apply(1, 1, quantity, MovementType::Out);

            prop_assert_eq!(model.quantity(1, 1), start);
        }
    }
}
