//! Inventory adjustment service for reconciling counted stock
//!
//! Adjustment items snapshot the recorded quantity at the moment the item
//! is persisted. Validation later moves the stored difference, not a fresh
//! re-read, so the document means what its author saw when counting.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::types::{DocumentStatus, DocumentType};
use shared::validation::{validate_name, validate_quantity};

use crate::error::{AppError, AppResult};
use crate::services::document::{
    adjustment_movements, apply_document_movements, ensure_validatable, next_reference,
    resolve_status_change, AdjustmentLine,
};

#[derive(Clone)]
pub struct AdjustmentService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct AdjustmentRow {
    id: Uuid,
    reference: String,
    reason: String,
    warehouse_id: Uuid,
    warehouse_name: Option<String>,
    status: String,
    created_by: Uuid,
    created_by_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Adjustment with its item lines
#[derive(Debug, Clone, Serialize)]
pub struct Adjustment {
    pub id: Uuid,
    pub reference: String,
    pub reason: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: Option<String>,
    pub status: DocumentStatus,
    pub created_by: Uuid,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<AdjustmentItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub counted_quantity: Decimal,
    pub recorded_quantity: Decimal,
    pub difference: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentItemInput {
    pub product_id: Uuid,
    pub counted_quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdjustmentInput {
    pub reason: String,
    pub warehouse_id: Uuid,
    pub status: Option<DocumentStatus>,
    pub items: Vec<AdjustmentItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdjustmentInput {
    pub reason: Option<String>,
    pub status: Option<DocumentStatus>,
    pub items: Option<Vec<AdjustmentItemInput>>,
}

fn validate_items(items: &[AdjustmentItemInput]) -> AppResult<()> {
    for item in items {
        validate_quantity(item.counted_quantity)
            .map_err(|msg| AppError::InvalidQuantity(msg.to_string()))?;
    }
    Ok(())
}

impl AdjustmentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<Adjustment>> {
        let rows = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            SELECT a.id, a.reference, a.reason, a.warehouse_id,
                   w.name as warehouse_name, a.status,
                   a.created_by, u.name as created_by_name,
                   a.created_at, a.updated_at
            FROM adjustments a
            LEFT JOIN warehouses w ON w.id = a.warehouse_id
            LEFT JOIN users u ON u.id = a.created_by
            ORDER BY a.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let doc_items = items.remove(&row.id).unwrap_or_default();
                build_adjustment(row, doc_items)
            })
            .collect()
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Adjustment> {
        let row = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            SELECT a.id, a.reference, a.reason, a.warehouse_id,
                   w.name as warehouse_name, a.status,
                   a.created_by, u.name as created_by_name,
                   a.created_at, a.updated_at
            FROM adjustments a
            LEFT JOIN warehouses w ON w.id = a.warehouse_id
            LEFT JOIN users u ON u.id = a.created_by
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Adjustment".to_string()))?;

        let mut items = self.items_for(&[id]).await?;
        build_adjustment(row, items.remove(&id).unwrap_or_default())
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateAdjustmentInput,
    ) -> AppResult<Adjustment> {
        validate_name(&input.reason, 500).map_err(|msg| AppError::Validation {
            field: "reason".to_string(),
            message: msg.to_string(),
        })?;
        validate_items(&input.items)?;

        let status = input.status.unwrap_or_default();

        let mut tx = self.db.begin().await?;

        let warehouse_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
        )
        .bind(input.warehouse_id)
        .fetch_one(&mut *tx)
        .await?;

        if !warehouse_exists {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        let reference = next_reference(&mut tx, "adjustments", "WH/ADJ").await?;

        let adjustment_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO adjustments (reference, reason, warehouse_id, status, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&reference)
        .bind(input.reason.trim())
        .bind(input.warehouse_id)
        .bind(status.as_str())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let lines =
            insert_items(&mut tx, adjustment_id, input.warehouse_id, &input.items).await?;

        if status == DocumentStatus::Done {
            let plan = adjustment_movements(input.warehouse_id, &lines);
            apply_document_movements(
                &mut tx,
                adjustment_id,
                DocumentType::Adjustment,
                user_id,
                &plan,
            )
            .await?;
        }

        tx.commit().await?;

        self.get(adjustment_id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        input: UpdateAdjustmentInput,
    ) -> AppResult<Adjustment> {
        if let Some(reason) = &input.reason {
            validate_name(reason, 500).map_err(|msg| AppError::Validation {
                field: "reason".to_string(),
                message: msg.to_string(),
            })?;
        }
        if let Some(items) = &input.items {
            validate_items(items)?;
        }

        let mut tx = self.db.begin().await?;

        let current_status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM adjustments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Adjustment".to_string()))?;

        let current: DocumentStatus = current_status.parse().map_err(AppError::Internal)?;
        let (new_status, fire_movements) =
            resolve_status_change(current, input.status, "Adjustment")?;

        let warehouse_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE adjustments
            SET reason = COALESCE($1, reason),
                status = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING warehouse_id
            "#,
        )
        .bind(input.reason.as_deref().map(str::trim))
        .bind(new_status.as_str())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(items) = &input.items {
            sqlx::query("DELETE FROM adjustment_items WHERE adjustment_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            insert_items(&mut tx, id, warehouse_id, items).await?;
        }

        if fire_movements {
            let lines = load_lines(&mut tx, id).await?;
            let plan = adjustment_movements(warehouse_id, &lines);
            apply_document_movements(&mut tx, id, DocumentType::Adjustment, user_id, &plan)
                .await?;
        }

        tx.commit().await?;

        self.get(id).await
    }

    pub async fn validate(&self, id: Uuid, user_id: Uuid) -> AppResult<Adjustment> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (String, Uuid)>(
            "SELECT status, warehouse_id FROM adjustments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Adjustment".to_string()))?;

        let current: DocumentStatus = row.0.parse().map_err(AppError::Internal)?;
        ensure_validatable(current, "Adjustment")?;

        sqlx::query(
            "UPDATE adjustments SET status = 'done', updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let lines = load_lines(&mut tx, id).await?;
        let plan = adjustment_movements(row.1, &lines);
        apply_document_movements(&mut tx, id, DocumentType::Adjustment, user_id, &plan).await?;

        tx.commit().await?;

        tracing::info!(adjustment_id = %id, movements = plan.len(), "Adjustment validated");

        self.get(id).await
    }

    async fn items_for(
        &self,
        ids: &[Uuid],
    ) -> AppResult<std::collections::HashMap<Uuid, Vec<AdjustmentItem>>> {
        #[derive(FromRow)]
        struct ItemRow {
            adjustment_id: Uuid,
            id: Uuid,
            product_id: Uuid,
            product_name: String,
            sku: String,
            counted_quantity: Decimal,
            recorded_quantity: Decimal,
            difference: Decimal,
        }

        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT ai.adjustment_id, ai.id, ai.product_id, p.name as product_name,
                   p.sku, ai.counted_quantity, ai.recorded_quantity, ai.difference
            FROM adjustment_items ai
            JOIN products p ON p.id = ai.product_id
            WHERE ai.adjustment_id = ANY($1)
            ORDER BY p.name
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: std::collections::HashMap<Uuid, Vec<AdjustmentItem>> =
            std::collections::HashMap::new();
        for row in rows {
            grouped
                .entry(row.adjustment_id)
                .or_default()
                .push(AdjustmentItem {
                    id: row.id,
                    product_id: row.product_id,
                    product_name: row.product_name,
                    sku: row.sku,
                    counted_quantity: row.counted_quantity,
                    recorded_quantity: row.recorded_quantity,
                    difference: row.difference,
                });
        }
        Ok(grouped)
    }
}

/// Persist adjustment items, snapshotting the recorded quantity as of now.
async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    adjustment_id: Uuid,
    warehouse_id: Uuid,
    items: &[AdjustmentItemInput],
) -> AppResult<Vec<AdjustmentLine>> {
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let recorded = sqlx::query_scalar::<_, Decimal>(
            "SELECT quantity FROM product_stocks WHERE product_id = $1 AND warehouse_id = $2",
        )
        .bind(item.product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut **tx)
        .await?
        .unwrap_or(Decimal::ZERO);

        let difference = item.counted_quantity - recorded;

        sqlx::query(
            r#"
            INSERT INTO adjustment_items
                (adjustment_id, product_id, counted_quantity, recorded_quantity, difference)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(adjustment_id)
        .bind(item.product_id)
        .bind(item.counted_quantity)
        .bind(recorded)
        .bind(difference)
        .execute(&mut **tx)
        .await?;

        lines.push(AdjustmentLine {
            product_id: item.product_id,
            difference,
        });
    }

    Ok(lines)
}

async fn load_lines(
    tx: &mut Transaction<'_, Postgres>,
    adjustment_id: Uuid,
) -> AppResult<Vec<AdjustmentLine>> {
    let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
        "SELECT product_id, difference FROM adjustment_items WHERE adjustment_id = $1",
    )
    .bind(adjustment_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(product_id, difference)| AdjustmentLine {
            product_id,
            difference,
        })
        .collect())
}

fn build_adjustment(row: AdjustmentRow, items: Vec<AdjustmentItem>) -> AppResult<Adjustment> {
    let status: DocumentStatus = row.status.parse().map_err(AppError::Internal)?;
    Ok(Adjustment {
        id: row.id,
        reference: row.reference,
        reason: row.reason,
        warehouse_id: row.warehouse_id,
        warehouse_name: row.warehouse_name,
        status,
        created_by: row.created_by,
        created_by_name: row.created_by_name,
        created_at: row.created_at,
        updated_at: row.updated_at,
        items,
    })
}
