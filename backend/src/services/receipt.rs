//! Receipt management service for incoming stock documents

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::types::{DocumentStatus, DocumentType};
use shared::validation::{validate_name, validate_quantity};

use crate::error::{AppError, AppResult};
use crate::services::document::{
    apply_document_movements, ensure_validatable, next_reference, receipt_movements,
    resolve_status_change, DocumentItem,
};

/// Receipt service for managing incoming stock documents
#[derive(Clone)]
pub struct ReceiptService {
    db: PgPool,
}

/// Database row for a receipt with display names joined in
#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: Uuid,
    reference: String,
    supplier: String,
    warehouse_id: Uuid,
    warehouse_name: Option<String>,
    status: String,
    scheduled_date: Option<NaiveDate>,
    created_by: Uuid,
    created_by_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Receipt with its item lines
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub id: Uuid,
    pub reference: String,
    pub supplier: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: Option<String>,
    pub status: DocumentStatus,
    pub scheduled_date: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<ReceiptItem>,
}

/// A receipt item line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReceiptItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
}

/// Input for one receipt item line
#[derive(Debug, Deserialize)]
pub struct ReceiptItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
}

/// Input for creating a receipt
#[derive(Debug, Deserialize)]
pub struct CreateReceiptInput {
    pub supplier: String,
    pub warehouse_id: Uuid,
    pub status: Option<DocumentStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub items: Vec<ReceiptItemInput>,
}

/// Input for updating a receipt
#[derive(Debug, Deserialize)]
pub struct UpdateReceiptInput {
    pub supplier: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub status: Option<DocumentStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub items: Option<Vec<ReceiptItemInput>>,
}

fn validate_items(items: &[ReceiptItemInput]) -> AppResult<()> {
    for item in items {
        validate_quantity(item.quantity)
            .map_err(|msg| AppError::InvalidQuantity(msg.to_string()))?;
    }
    Ok(())
}

impl ReceiptService {
    /// Create a new ReceiptService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all receipts with their items
    pub async fn list(&self) -> AppResult<Vec<Receipt>> {
        let rows = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT r.id, r.reference, r.supplier, r.warehouse_id,
                   w.name as warehouse_name, r.status, r.scheduled_date,
                   r.created_by, u.name as created_by_name,
                   r.created_at, r.updated_at
            FROM receipts r
            LEFT JOIN warehouses w ON w.id = r.warehouse_id
            LEFT JOIN users u ON u.id = r.created_by
            ORDER BY r.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let doc_items = items.remove(&row.id).unwrap_or_default();
                build_receipt(row, doc_items)
            })
            .collect()
    }

    /// Get a receipt by ID with its items
    pub async fn get(&self, id: Uuid) -> AppResult<Receipt> {
        let row = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT r.id, r.reference, r.supplier, r.warehouse_id,
                   w.name as warehouse_name, r.status, r.scheduled_date,
                   r.created_by, u.name as created_by_name,
                   r.created_at, r.updated_at
            FROM receipts r
            LEFT JOIN warehouses w ON w.id = r.warehouse_id
            LEFT JOIN users u ON u.id = r.created_by
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt".to_string()))?;

        let mut items = self.items_for(&[id]).await?;
        build_receipt(row, items.remove(&id).unwrap_or_default())
    }

    /// Create a receipt; creating it directly as done applies its movements
    /// in the same transaction.
    pub async fn create(&self, user_id: Uuid, input: CreateReceiptInput) -> AppResult<Receipt> {
        validate_name(&input.supplier, 255).map_err(|msg| AppError::Validation {
            field: "supplier".to_string(),
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

        let reference = next_reference(&mut tx, "receipts", "WH/IN").await?;

        let receipt_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO receipts (reference, supplier, warehouse_id, status, scheduled_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&reference)
        .bind(input.supplier.trim())
        .bind(input.warehouse_id)
        .bind(status.as_str())
        .bind(input.scheduled_date)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for item in &input.items {
            sqlx::query(
                r#"
                INSERT INTO receipt_items (receipt_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(receipt_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        if status == DocumentStatus::Done {
            let doc_items: Vec<DocumentItem> = input
                .items
                .iter()
                .map(|i| DocumentItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect();
            let plan = receipt_movements(input.warehouse_id, &doc_items);
            apply_document_movements(&mut tx, receipt_id, DocumentType::Receipt, user_id, &plan)
                .await?;
        }

        tx.commit().await?;

        self.get(receipt_id).await
    }

    /// Update a receipt; a status change into done applies its movements in
    /// the same transaction, with the same already-validated guard as the
    /// explicit validate action.
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        input: UpdateReceiptInput,
    ) -> AppResult<Receipt> {
        if let Some(supplier) = &input.supplier {
            validate_name(supplier, 255).map_err(|msg| AppError::Validation {
                field: "supplier".to_string(),
                message: msg.to_string(),
            })?;
        }
        if let Some(items) = &input.items {
            validate_items(items)?;
        }

        let mut tx = self.db.begin().await?;

        let current_status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM receipts WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt".to_string()))?;

        let current: DocumentStatus = current_status
            .parse()
            .map_err(AppError::Internal)?;
        let (new_status, fire_movements) = resolve_status_change(current, input.status, "Receipt")?;

        let warehouse_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE receipts
            SET supplier = COALESCE($1, supplier),
                warehouse_id = COALESCE($2, warehouse_id),
                status = $3,
                scheduled_date = COALESCE($4, scheduled_date),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $5
            RETURNING warehouse_id
            "#,
        )
        .bind(input.supplier.as_deref().map(str::trim))
        .bind(input.warehouse_id)
        .bind(new_status.as_str())
        .bind(input.scheduled_date)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(items) = &input.items {
            sqlx::query("DELETE FROM receipt_items WHERE receipt_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for item in items {
                sqlx::query(
                    r#"
                    INSERT INTO receipt_items (receipt_id, product_id, quantity, unit_price)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(id)
                .bind(item.product_id)
                .bind(item.quantity)
                .bind(item.unit_price)
                .execute(&mut *tx)
                .await?;
            }
        }

        if fire_movements {
            let doc_items = load_document_items(&mut tx, id).await?;
            let plan = receipt_movements(warehouse_id, &doc_items);
            apply_document_movements(&mut tx, id, DocumentType::Receipt, user_id, &plan).await?;
        }

        tx.commit().await?;

        self.get(id).await
    }

    /// Validate a receipt: transition it to done and apply its movements,
    /// all in one transaction.
    pub async fn validate(&self, id: Uuid, user_id: Uuid) -> AppResult<Receipt> {
        let mut tx = self.db.begin().await?;

        // Lock the document row so concurrent validations serialize
        let row = sqlx::query_as::<_, (String, Uuid)>(
            "SELECT status, warehouse_id FROM receipts WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt".to_string()))?;

        let current: DocumentStatus = row.0.parse().map_err(AppError::Internal)?;
        ensure_validatable(current, "Receipt")?;

        sqlx::query(
            "UPDATE receipts SET status = 'done', updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let doc_items = load_document_items(&mut tx, id).await?;
        let plan = receipt_movements(row.1, &doc_items);
        apply_document_movements(&mut tx, id, DocumentType::Receipt, user_id, &plan).await?;

        tx.commit().await?;

        tracing::info!(receipt_id = %id, movements = plan.len(), "Receipt validated");

        self.get(id).await
    }

    /// Fetch items for a set of receipts, grouped by receipt id
    async fn items_for(
        &self,
        ids: &[Uuid],
    ) -> AppResult<std::collections::HashMap<Uuid, Vec<ReceiptItem>>> {
        #[derive(FromRow)]
        struct ItemRow {
            receipt_id: Uuid,
            id: Uuid,
            product_id: Uuid,
            product_name: String,
            sku: String,
            quantity: Decimal,
            unit_price: Option<Decimal>,
        }

        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT ri.receipt_id, ri.id, ri.product_id, p.name as product_name,
                   p.sku, ri.quantity, ri.unit_price
            FROM receipt_items ri
            JOIN products p ON p.id = ri.product_id
            WHERE ri.receipt_id = ANY($1)
            ORDER BY p.name
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: std::collections::HashMap<Uuid, Vec<ReceiptItem>> =
            std::collections::HashMap::new();
        for row in rows {
            grouped.entry(row.receipt_id).or_default().push(ReceiptItem {
                id: row.id,
                product_id: row.product_id,
                product_name: row.product_name,
                sku: row.sku,
                quantity: row.quantity,
                unit_price: row.unit_price,
            });
        }
        Ok(grouped)
    }
}

async fn load_document_items(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    receipt_id: Uuid,
) -> AppResult<Vec<DocumentItem>> {
    let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
        "SELECT product_id, quantity FROM receipt_items WHERE receipt_id = $1",
    )
    .bind(receipt_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(product_id, quantity)| DocumentItem {
            product_id,
            quantity,
        })
        .collect())
}

fn build_receipt(row: ReceiptRow, items: Vec<ReceiptItem>) -> AppResult<Receipt> {
    let status: DocumentStatus = row.status.parse().map_err(AppError::Internal)?;
    Ok(Receipt {
        id: row.id,
        reference: row.reference,
        supplier: row.supplier,
        warehouse_id: row.warehouse_id,
        warehouse_name: row.warehouse_name,
        status,
        scheduled_date: row.scheduled_date,
        created_by: row.created_by,
        created_by_name: row.created_by_name,
        created_at: row.created_at,
        updated_at: row.updated_at,
        items,
    })
}
