//! Transfer management service for moving stock between warehouses

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::types::{DocumentStatus, DocumentType};
use shared::validation::validate_quantity;

use crate::error::{AppError, AppResult};
use crate::services::document::{
    apply_document_movements, ensure_validatable, next_reference, resolve_status_change,
    transfer_movements, DocumentItem,
};

#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct TransferRow {
    id: Uuid,
    reference: String,
    from_warehouse_id: Uuid,
    from_warehouse_name: Option<String>,
    to_warehouse_id: Uuid,
    to_warehouse_name: Option<String>,
    status: String,
    scheduled_date: Option<NaiveDate>,
    created_by: Uuid,
    created_by_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Transfer with its item lines
#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    pub id: Uuid,
    pub reference: String,
    pub from_warehouse_id: Uuid,
    pub from_warehouse_name: Option<String>,
    pub to_warehouse_id: Uuid,
    pub to_warehouse_name: Option<String>,
    pub status: DocumentStatus,
    pub scheduled_date: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<TransferItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TransferItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferInput {
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub status: Option<DocumentStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub items: Vec<TransferItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransferInput {
    pub from_warehouse_id: Option<Uuid>,
    pub to_warehouse_id: Option<Uuid>,
    pub status: Option<DocumentStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub items: Option<Vec<TransferItemInput>>,
}

fn validate_items(items: &[TransferItemInput]) -> AppResult<()> {
    for item in items {
        validate_quantity(item.quantity)
            .map_err(|msg| AppError::InvalidQuantity(msg.to_string()))?;
    }
    Ok(())
}

fn ensure_distinct_warehouses(from: Uuid, to: Uuid) -> AppResult<()> {
    if from == to {
        return Err(AppError::Validation {
            field: "to_warehouse_id".to_string(),
            message: "Source and destination warehouses must differ".to_string(),
        });
    }
    Ok(())
}

impl TransferService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<Transfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT t.id, t.reference, t.from_warehouse_id,
                   wf.name as from_warehouse_name, t.to_warehouse_id,
                   wt.name as to_warehouse_name, t.status, t.scheduled_date,
                   t.created_by, u.name as created_by_name,
                   t.created_at, t.updated_at
            FROM transfers t
            LEFT JOIN warehouses wf ON wf.id = t.from_warehouse_id
            LEFT JOIN warehouses wt ON wt.id = t.to_warehouse_id
            LEFT JOIN users u ON u.id = t.created_by
            ORDER BY t.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let doc_items = items.remove(&row.id).unwrap_or_default();
                build_transfer(row, doc_items)
            })
            .collect()
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Transfer> {
        let row = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT t.id, t.reference, t.from_warehouse_id,
                   wf.name as from_warehouse_name, t.to_warehouse_id,
                   wt.name as to_warehouse_name, t.status, t.scheduled_date,
                   t.created_by, u.name as created_by_name,
                   t.created_at, t.updated_at
            FROM transfers t
            LEFT JOIN warehouses wf ON wf.id = t.from_warehouse_id
            LEFT JOIN warehouses wt ON wt.id = t.to_warehouse_id
            LEFT JOIN users u ON u.id = t.created_by
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))?;

        let mut items = self.items_for(&[id]).await?;
        build_transfer(row, items.remove(&id).unwrap_or_default())
    }

    pub async fn create(&self, user_id: Uuid, input: CreateTransferInput) -> AppResult<Transfer> {
        ensure_distinct_warehouses(input.from_warehouse_id, input.to_warehouse_id)?;
        validate_items(&input.items)?;

        let status = input.status.unwrap_or_default();

        let mut tx = self.db.begin().await?;

        let warehouses_exist = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM warehouses WHERE id = ANY($1)",
        )
        .bind(vec![input.from_warehouse_id, input.to_warehouse_id])
        .fetch_one(&mut *tx)
        .await?;

        if warehouses_exist != 2 {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        let reference = next_reference(&mut tx, "transfers", "WH/TR").await?;

        let transfer_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO transfers (reference, from_warehouse_id, to_warehouse_id, status, scheduled_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&reference)
        .bind(input.from_warehouse_id)
        .bind(input.to_warehouse_id)
        .bind(status.as_str())
        .bind(input.scheduled_date)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for item in &input.items {
            sqlx::query(
                "INSERT INTO transfer_items (transfer_id, product_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(transfer_id)
            .bind(item.product_id)
            .bind(item.quantity)
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
            let plan =
                transfer_movements(input.from_warehouse_id, input.to_warehouse_id, &doc_items);
            apply_document_movements(&mut tx, transfer_id, DocumentType::Transfer, user_id, &plan)
                .await?;
        }

        tx.commit().await?;

        self.get(transfer_id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        input: UpdateTransferInput,
    ) -> AppResult<Transfer> {
        if let Some(items) = &input.items {
            validate_items(items)?;
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (String, Uuid, Uuid)>(
            "SELECT status, from_warehouse_id, to_warehouse_id FROM transfers WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))?;

        let current: DocumentStatus = row.0.parse().map_err(AppError::Internal)?;
        let (new_status, fire_movements) =
            resolve_status_change(current, input.status, "Transfer")?;

        let from_warehouse_id = input.from_warehouse_id.unwrap_or(row.1);
        let to_warehouse_id = input.to_warehouse_id.unwrap_or(row.2);
        ensure_distinct_warehouses(from_warehouse_id, to_warehouse_id)?;

        sqlx::query(
            r#"
            UPDATE transfers
            SET from_warehouse_id = $1,
                to_warehouse_id = $2,
                status = $3,
                scheduled_date = COALESCE($4, scheduled_date),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $5
            "#,
        )
        .bind(from_warehouse_id)
        .bind(to_warehouse_id)
        .bind(new_status.as_str())
        .bind(input.scheduled_date)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(items) = &input.items {
            sqlx::query("DELETE FROM transfer_items WHERE transfer_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for item in items {
                sqlx::query(
                    "INSERT INTO transfer_items (transfer_id, product_id, quantity) VALUES ($1, $2, $3)",
                )
                .bind(id)
                .bind(item.product_id)
                .bind(item.quantity)
                .execute(&mut *tx)
                .await?;
            }
        }

        if fire_movements {
            let doc_items = load_document_items(&mut tx, id).await?;
            let plan = transfer_movements(from_warehouse_id, to_warehouse_id, &doc_items);
            apply_document_movements(&mut tx, id, DocumentType::Transfer, user_id, &plan).await?;
        }

        tx.commit().await?;

        self.get(id).await
    }

    pub async fn validate(&self, id: Uuid, user_id: Uuid) -> AppResult<Transfer> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (String, Uuid, Uuid)>(
            "SELECT status, from_warehouse_id, to_warehouse_id FROM transfers WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))?;

        let current: DocumentStatus = row.0.parse().map_err(AppError::Internal)?;
        ensure_validatable(current, "Transfer")?;

        sqlx::query(
            "UPDATE transfers SET status = 'done', updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let doc_items = load_document_items(&mut tx, id).await?;
        let plan = transfer_movements(row.1, row.2, &doc_items);
        apply_document_movements(&mut tx, id, DocumentType::Transfer, user_id, &plan).await?;

        tx.commit().await?;

        tracing::info!(transfer_id = %id, movements = plan.len(), "Transfer validated");

        self.get(id).await
    }

    async fn items_for(
        &self,
        ids: &[Uuid],
    ) -> AppResult<std::collections::HashMap<Uuid, Vec<TransferItem>>> {
        #[derive(FromRow)]
        struct ItemRow {
            transfer_id: Uuid,
            id: Uuid,
            product_id: Uuid,
            product_name: String,
            sku: String,
            quantity: Decimal,
        }

        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT ti.transfer_id, ti.id, ti.product_id, p.name as product_name,
                   p.sku, ti.quantity
            FROM transfer_items ti
            JOIN products p ON p.id = ti.product_id
            WHERE ti.transfer_id = ANY($1)
            ORDER BY p.name
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: std::collections::HashMap<Uuid, Vec<TransferItem>> =
            std::collections::HashMap::new();
        for row in rows {
            grouped.entry(row.transfer_id).or_default().push(TransferItem {
                id: row.id,
                product_id: row.product_id,
                product_name: row.product_name,
                sku: row.sku,
                quantity: row.quantity,
            });
        }
        Ok(grouped)
    }
}

async fn load_document_items(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    transfer_id: Uuid,
) -> AppResult<Vec<DocumentItem>> {
    let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
        "SELECT product_id, quantity FROM transfer_items WHERE transfer_id = $1",
    )
    .bind(transfer_id)
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

fn build_transfer(row: TransferRow, items: Vec<TransferItem>) -> AppResult<Transfer> {
    let status: DocumentStatus = row.status.parse().map_err(AppError::Internal)?;
    Ok(Transfer {
        id: row.id,
        reference: row.reference,
        from_warehouse_id: row.from_warehouse_id,
        from_warehouse_name: row.from_warehouse_name,
        to_warehouse_id: row.to_warehouse_id,
        to_warehouse_name: row.to_warehouse_name,
        status,
        scheduled_date: row.scheduled_date,
        created_by: row.created_by,
        created_by_name: row.created_by_name,
        created_at: row.created_at,
        updated_at: row.updated_at,
        items,
    })
}
