//! Shared document workflow machinery
//!
//! The four document types (receipt, delivery, transfer, adjustment) share
//! one status machine and one "apply movements on entering done" routine.
//! Each document service builds a movement plan with the pure planners here
//! and hands it to [`apply_document_movements`] inside its own transaction,
//! so a multi-item validation is all-or-nothing.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use shared::types::{DocumentStatus, DocumentType, MovementType};

use crate::error::{AppError, AppResult};
use crate::services::stock::{apply_movement_tx, MovementInput};

/// An (product, quantity) line on a receipt, delivery or transfer
#[derive(Debug, Clone)]
pub struct DocumentItem {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

/// An adjustment line reduced to what the planner needs
#[derive(Debug, Clone)]
pub struct AdjustmentLine {
    pub product_id: Uuid,
    pub difference: Decimal,
}

/// One movement a document will fire on validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMovement {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub movement_type: MovementType,
}

/// Receipts bring every item into the receiving warehouse.
pub fn receipt_movements(warehouse_id: Uuid, items: &[DocumentItem]) -> Vec<PlannedMovement> {
    items
        .iter()
        .map(|item| PlannedMovement {
            product_id: item.product_id,
            warehouse_id,
            quantity: item.quantity,
            movement_type: MovementType::In,
        })
        .collect()
}

/// Deliveries take every item out of the shipping warehouse.
pub fn delivery_movements(warehouse_id: Uuid, items: &[DocumentItem]) -> Vec<PlannedMovement> {
    items
        .iter()
        .map(|item| PlannedMovement {
            product_id: item.product_id,
            warehouse_id,
            quantity: item.quantity,
            movement_type: MovementType::Out,
        })
        .collect()
}

/// Transfers fire two movements per item: out of the source warehouse and
/// into the destination.
pub fn transfer_movements(
    from_warehouse_id: Uuid,
    to_warehouse_id: Uuid,
    items: &[DocumentItem],
) -> Vec<PlannedMovement> {
    let mut movements = Vec::with_capacity(items.len() * 2);
    for item in items {
        movements.push(PlannedMovement {
            product_id: item.product_id,
            warehouse_id: from_warehouse_id,
            quantity: item.quantity,
            movement_type: MovementType::Out,
        });
        movements.push(PlannedMovement {
            product_id: item.product_id,
            warehouse_id: to_warehouse_id,
            quantity: item.quantity,
            movement_type: MovementType::In,
        });
    }
    movements
}

/// Adjustments move the absolute difference between counted and recorded
/// quantities, in for surpluses and out for shortages. Lines with no
/// difference fire nothing.
pub fn adjustment_movements(warehouse_id: Uuid, items: &[AdjustmentLine]) -> Vec<PlannedMovement> {
    items
        .iter()
        .filter(|item| item.difference != Decimal::ZERO)
        .map(|item| PlannedMovement {
            product_id: item.product_id,
            warehouse_id,
            quantity: item.difference.abs(),
            movement_type: if item.difference > Decimal::ZERO {
                MovementType::In
            } else {
                MovementType::Out
            },
        })
        .collect()
}

/// Apply a document's movement plan inside the caller's transaction.
///
/// The caller holds the transaction that also carries the document's status
/// change, so the status flip and every ledger write commit together.
pub async fn apply_document_movements(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    document_type: DocumentType,
    user_id: Uuid,
    movements: &[PlannedMovement],
) -> AppResult<()> {
    for movement in movements {
        apply_movement_tx(
            tx,
            &MovementInput {
                product_id: movement.product_id,
                warehouse_id: movement.warehouse_id,
                quantity: movement.quantity,
                document_id,
                document_type,
                movement_type: movement.movement_type,
                user_id,
            },
        )
        .await?;
    }
    Ok(())
}

/// Decide the outcome of a status-bearing update on a document.
///
/// Returns the effective status and whether movements fire. A `done`
/// document being set to `done` again is an explicit re-validation attempt;
/// any other touch of a terminal document is an invalid transition.
pub fn resolve_status_change(
    current: DocumentStatus,
    requested: Option<DocumentStatus>,
    document: &str,
) -> AppResult<(DocumentStatus, bool)> {
    if current.is_terminal() {
        if current == DocumentStatus::Done && requested == Some(DocumentStatus::Done) {
            return Err(AppError::AlreadyValidated(document.to_string()));
        }
        return Err(AppError::InvalidStateTransition(format!(
            "{} is {} and can no longer be modified",
            document, current
        )));
    }

    let next = requested.unwrap_or(current);
    Ok((next, current.triggers_movements(next)))
}

/// Guard for the explicit validate action.
pub fn ensure_validatable(current: DocumentStatus, document: &str) -> AppResult<()> {
    match current {
        DocumentStatus::Done => Err(AppError::AlreadyValidated(document.to_string())),
        DocumentStatus::Canceled => Err(AppError::InvalidStateTransition(format!(
            "{} is canceled and cannot be validated",
            document
        ))),
        _ => Ok(()),
    }
}

/// Generate the next document reference for a table, e.g. `WH/IN/0042`.
///
/// Runs inside the creation transaction so the count and the insert agree.
pub async fn next_reference(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    prefix: &str,
) -> AppResult<String> {
    // `table` is always a compile-time constant from the document services.
    let query = format!(
        "SELECT COUNT(*) FROM {} WHERE reference LIKE $1",
        table
    );
    let count = sqlx::query_scalar::<_, i64>(&query)
        .bind(format!("{}/%", prefix))
        .fetch_one(&mut **tx)
        .await?;

    Ok(format!("{}/{:04}", prefix, count + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn transfer_plans_two_movements_per_item() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let product = Uuid::new_v4();
        let plan = transfer_movements(
            from,
            to,
            &[DocumentItem {
                product_id: product,
                quantity: dec(3),
            }],
        );

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].warehouse_id, from);
        assert_eq!(plan[0].movement_type, MovementType::Out);
        assert_eq!(plan[1].warehouse_id, to);
        assert_eq!(plan[1].movement_type, MovementType::In);
        assert_eq!(plan[0].quantity, dec(3));
        assert_eq!(plan[1].quantity, dec(3));
    }

    #[test]
    fn adjustment_shortage_plans_out() {
        let warehouse = Uuid::new_v4();
        let product = Uuid::new_v4();
        // counted 15, recorded 20
        let plan = adjustment_movements(
            warehouse,
            &[AdjustmentLine {
                product_id: product,
                difference: dec(-5),
            }],
        );

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].movement_type, MovementType::Out);
        assert_eq!(plan[0].quantity, dec(5));
    }

    #[test]
    fn adjustment_zero_difference_plans_nothing() {
        let plan = adjustment_movements(
            Uuid::new_v4(),
            &[AdjustmentLine {
                product_id: Uuid::new_v4(),
                difference: dec(0),
            }],
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn status_update_fires_only_on_entering_done() {
        let (next, fire) =
            resolve_status_change(DocumentStatus::Draft, Some(DocumentStatus::Done), "Receipt")
                .unwrap();
        assert_eq!(next, DocumentStatus::Done);
        assert!(fire);

        let (next, fire) =
            resolve_status_change(DocumentStatus::Draft, Some(DocumentStatus::Ready), "Receipt")
                .unwrap();
        assert_eq!(next, DocumentStatus::Ready);
        assert!(!fire);

        let (next, fire) = resolve_status_change(DocumentStatus::Waiting, None, "Receipt").unwrap();
        assert_eq!(next, DocumentStatus::Waiting);
        assert!(!fire);
    }

    #[test]
    fn revalidation_is_rejected() {
        let err =
            resolve_status_change(DocumentStatus::Done, Some(DocumentStatus::Done), "Receipt")
                .unwrap_err();
        assert!(matches!(err, AppError::AlreadyValidated(_)));

        let err = ensure_validatable(DocumentStatus::Done, "Receipt").unwrap_err();
        assert!(matches!(err, AppError::AlreadyValidated(_)));
    }

    #[test]
    fn terminal_documents_reject_edits() {
        let err = resolve_status_change(DocumentStatus::Canceled, None, "Transfer").unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        let err = ensure_validatable(DocumentStatus::Canceled, "Transfer").unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }
}
