//! Document workflow tests
//!
//! Tests for the document status machine and the movement plans the four
//! document types produce on validation:
//! - movements fire exactly once, on entering done
//! - terminal documents reject further edits and validation
//! - transfers and adjustments plan the right movement pairs

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::types::{DocumentStatus, MovementType};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const ALL_STATUSES: [DocumentStatus; 5] = [
    DocumentStatus::Draft,
    DocumentStatus::Waiting,
    DocumentStatus::Ready,
    DocumentStatus::Done,
    DocumentStatus::Canceled,
];

/// A planned movement, as the document services build before applying
#[derive(Debug, Clone, PartialEq, Eq)]
struct Planned {
    product: u32,
    warehouse: u32,
    quantity: Decimal,
    movement: MovementType,
}

fn plan_transfer(from: u32, to: u32, items: &[(u32, Decimal)]) -> Vec<Planned> {
    let mut plan = Vec::new();
    for (product, quantity) in items {
        plan.push(Planned {
            product: *product,
            warehouse: from,
            quantity: *quantity,
            movement: MovementType::Out,
        });
        plan.push(Planned {
            product: *product,
            warehouse: to,
            quantity: *quantity,
            movement: MovementType::In,
        });
    }
    plan
}

fn plan_adjustment(warehouse: u32, lines: &[(u32, Decimal)]) -> Vec<Planned> {
    lines
        .iter()
        .filter(|(_, difference)| *difference != Decimal::ZERO)
        .map(|(product, difference)| Planned {
            product: *product,
            warehouse,
            quantity: difference.abs(),
            movement: if *difference > Decimal::ZERO {
                MovementType::In
            } else {
                MovementType::Out
            },
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// All statuses round-trip through their text form
    #[test]
    fn test_status_round_trip() {
        for status in ALL_STATUSES {
            let text = status.as_str();
            assert_eq!(text.parse::<DocumentStatus>().unwrap(), status);
        }
    }

    /// Only done and canceled are terminal
    #[test]
    fn test_terminal_statuses() {
        assert!(DocumentStatus::Done.is_terminal());
        assert!(DocumentStatus::Canceled.is_terminal());
        assert!(!DocumentStatus::Draft.is_terminal());
        assert!(!DocumentStatus::Waiting.is_terminal());
        assert!(!DocumentStatus::Ready.is_terminal());
    }

    /// Movements fire only when a non-done document enters done
    #[test]
    fn test_movements_fire_on_entering_done() {
        assert!(DocumentStatus::Draft.triggers_movements(DocumentStatus::Done));
        assert!(DocumentStatus::Waiting.triggers_movements(DocumentStatus::Done));
        assert!(DocumentStatus::Ready.triggers_movements(DocumentStatus::Done));
    }

    /// A done document set to done again does not fire movements again
    #[test]
    fn test_done_does_not_refire() {
        assert!(!DocumentStatus::Done.triggers_movements(DocumentStatus::Done));
    }

    /// Non-done transitions fire nothing
    #[test]
    fn test_non_done_transitions_fire_nothing() {
        assert!(!DocumentStatus::Draft.triggers_movements(DocumentStatus::Waiting));
        assert!(!DocumentStatus::Waiting.triggers_movements(DocumentStatus::Ready));
        assert!(!DocumentStatus::Ready.triggers_movements(DocumentStatus::Canceled));
        assert!(!DocumentStatus::Draft.triggers_movements(DocumentStatus::Draft));
    }

    /// Transfers plan an out of the source and an in to the destination
    /// for every item, source first
    #[test]
    fn test_transfer_plans_two_movements_per_item() {
        let plan = plan_transfer(1, 2, &[(10, dec("5")), (11, dec("3"))]);

        assert_eq!(plan.len(), 4);
        assert_eq!(plan[0].movement, MovementType::Out);
        assert_eq!(plan[0].warehouse, 1);
        assert_eq!(plan[1].movement, MovementType::In);
        assert_eq!(plan[1].warehouse, 2);
        assert_eq!(plan[0].quantity, plan[1].quantity);
        assert_eq!(plan[2].product, 11);
    }

    /// Adjustment surpluses plan in, shortages plan out, both by the
    /// absolute difference
    #[test]
    fn test_adjustment_plan_directions() {
        let plan = plan_adjustment(1, &[(10, dec("4")), (11, dec("-2.5"))]);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].movement, MovementType::In);
        assert_eq!(plan[0].quantity, dec("4"));
        assert_eq!(plan[1].movement, MovementType::Out);
        assert_eq!(plan[1].quantity, dec("2.5"));
    }

    /// Adjustment lines with no difference fire nothing
    #[test]
    fn test_adjustment_skips_zero_difference() {
        let plan = plan_adjustment(1, &[(10, Decimal::ZERO), (11, dec("1"))]);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].product, 11);
    }

    /// Adjustment differences come from counted minus recorded
    #[test]
    fn test_adjustment_difference_computation() {
        let recorded = dec("20");
        let counted = dec("17.5");
        let difference = counted - recorded;

        assert_eq!(difference, dec("-2.5"));
        // shortage: moves out by the absolute difference
        assert!(difference < Decimal::ZERO);
        assert_eq!(difference.abs(), dec("2.5"));
    }

    /// Document references are sequential per prefix, zero-padded to four
    #[test]
    fn test_reference_format() {
        let reference = format!("{}/{:04}", "WH/IN", 1);
        assert_eq!(reference, "WH/IN/0001");

        let reference = format!("{}/{:04}", "WH/TR", 42);
        assert_eq!(reference, "WH/TR/0042");

        let reference = format!("{}/{:04}", "WH/ADJ", 12345);
        assert_eq!(reference, "WH/ADJ/12345");
    }

    /// Whitespace-only text fields trim to empty and are rejected, on
    /// update as well as create
    #[test]
    fn test_whitespace_only_text_fields_rejected() {
        use shared::validation::validate_name;

        assert!(validate_name("   ", 255).is_err());
        assert!(validate_name("", 500).is_err());
        assert!(validate_name("\t\n", 500).is_err());
        assert!(validate_name("Cycle count Q3", 500).is_ok());
    }

    /// Statuses serialize as lowercase text
    #[test]
    fn test_status_text_forms() {
        assert_eq!(DocumentStatus::Draft.as_str(), "draft");
        assert_eq!(DocumentStatus::Waiting.as_str(), "waiting");
        assert_eq!(DocumentStatus::Ready.as_str(), "ready");
        assert_eq!(DocumentStatus::Done.as_str(), "done");
        assert_eq!(DocumentStatus::Canceled.as_str(), "canceled");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn status_strategy() -> impl Strategy<Value = DocumentStatus> {
        prop_oneof![
            Just(DocumentStatus::Draft),
            Just(DocumentStatus::Waiting),
            Just(DocumentStatus::Ready),
            Just(DocumentStatus::Done),
            Just(DocumentStatus::Canceled),
        ]
    }

    fn difference_strategy() -> impl Strategy<Value = Decimal> {
        (-10000i64..=10000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Movements fire exactly when entering done from a non-done status
        #[test]
        fn prop_fire_iff_entering_done(
            current in status_strategy(),
            next in status_strategy(),
        ) {
            let fires = current.triggers_movements(next);
            prop_assert_eq!(
                fires,
                next == DocumentStatus::Done && current != DocumentStatus::Done
            );
        }

        /// Through any status path, a document fires movements at most once
        #[test]
        fn prop_document_fires_at_most_once(
            path in prop::collection::vec(status_strategy(), 1..20)
        ) {
            let mut current = DocumentStatus::Draft;
            let mut fired = 0;
            for next in path {
                // terminal documents accept no further transitions
                if current.is_terminal() {
                    break;
                }
                if current.triggers_movements(next) {
                    fired += 1;
                }
                current = next;
            }
            prop_assert!(fired <= 1);
        }

        /// A transfer plan is balanced: every out has a matching in of the
        /// same product and quantity
        #[test]
        fn prop_transfer_plan_balanced(
            items in prop::collection::vec((0u32..10, (1i64..=10000i64)), 1..10)
        ) {
            let items: Vec<(u32, Decimal)> = items
                .into_iter()
                .map(|(p, q)| (p, Decimal::new(q, 2)))
                .collect();
            let plan = plan_transfer(1, 2, &items);

            prop_assert_eq!(plan.len(), items.len() * 2);

            let total_out: Decimal = plan
                .iter()
                .filter(|m| m.movement == MovementType::Out)
                .map(|m| m.quantity)
                .sum();
            let total_in: Decimal = plan
                .iter()
                .filter(|m| m.movement == MovementType::In)
                .map(|m| m.quantity)
                .sum();
            prop_assert_eq!(total_out, total_in);
        }

        /// Adjustment plans carry positive quantities and preserve the net
        /// signed difference of the nonzero lines
        #[test]
        fn prop_adjustment_plan_preserves_net(
            lines in prop::collection::vec((0u32..10, difference_strategy()), 0..10)
        ) {
            let plan = plan_adjustment(1, &lines);

            for movement in &plan {
                prop_assert!(movement.quantity > Decimal::ZERO);
            }

            let net: Decimal = plan
                .iter()
                .map(|m| match m.movement {
                    MovementType::In => m.quantity,
                    MovementType::Out => -m.quantity,
                })
                .sum();
            let expected: Decimal = lines.iter().map(|(_, d)| *d).sum();
            prop_assert_eq!(net, expected);
        }
    }
}
