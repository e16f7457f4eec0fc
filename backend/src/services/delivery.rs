//! Delivery management service for outgoing stock documents

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::types::{DocumentStatus, DocumentType};
use shared::validation::{validate_name, validate_quantity};

use crate::error::{AppError, AppResult};
use crate::services::document::{
    apply_document_movements, delivery_movements, ensure_validatable, next_reference,
    resolve_status_change, DocumentItem,
};

#[derive(Clone)]
pub struct DeliveryService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    id: Uuid,
    reference: String,
    customer: String,
    warehouse_id: Uuid,
    warehouse_name: Option<String>,
    status: String,
    scheduled_date: Option<NaiveDate>,
    created_by: Uuid,
    created_by_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Delivery with its item lines
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub id: Uuid,
    pub reference: String,
    pub customer: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: Option<String>,
    pub status: DocumentStatus,
    pub scheduled_date: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<DeliveryItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateDeliveryInput {
    pub customer: String,
    pub warehouse_id: Uuid,
    pub status: Option<DocumentStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub items: Vec<DeliveryItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeliveryInput {
    pub customer: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub status: Option<DocumentStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub items: Option<Vec<DeliveryItemInput>>,
}

fn validate_items(items: &[DeliveryItemInput]) -> AppResult<()> {
    for item in items {
        validate_quantity(item.quantity)
            .map_err(|msg| AppError::InvalidQuantity(msg.to_string()))?;
    }
    Ok(())
}

impl DeliveryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<Delivery>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT d.id, d.reference, d.customer, d.warehouse_id,
                   w.name as warehouse_name, d.status, d.scheduled_date,
                   d.created_by, u.name as created_by_name,
                   d.created_at, d.updated_at
            FROM deliveries d
            LEFT JOIN warehouses w ON w.id = d.warehouse_id
            LEFT JOIN users u ON u.id = d.created_by
            ORDER BY d.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let doc_items = items.remove(&row.id).unwrap_or_default();
                build_delivery(row, doc_items)
            })
            .collect()
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Delivery> {
        let row = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT d.id, d.reference, d.customer, d.warehouse_id,
                   w.name as warehouse_name, d.status, d.scheduled_date,
                   d.created_by, u.name as created_by_name,
                   d.created_at, d.updated_at
            FROM deliveries d
            LEFT JOIN warehouses w ON w.id = d.warehouse_id
            LEFT JOIN users u ON u.id = d.created_by
            WHERE d.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery".to_string()))?;

        let mut items = self.items_for(&[id]).await?;
        build_delivery(row, items.remove(&id).unwrap_or_default())
    }

    pub async fn create(&self, user_id: Uuid, input: CreateDeliveryInput) -> AppResult<Delivery> {
        validate_name(&input.customer, 255).map_err(|msg| AppError::Validation {
            field: "customer".to_string(),
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

        let reference = next_reference(&mut tx, "deliveries", "WH/OUT").await?;

        let delivery_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO deliveries (reference, customer, warehouse_id, status, scheduled_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&reference)
        .bind(input.customer.trim())
        .bind(input.warehouse_id)
        .bind(status.as_str())
        .bind(input.scheduled_date)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for item in &input.items {
            sqlx::query(
                "INSERT INTO delivery_items (delivery_id, product_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(delivery_id)
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
            let plan = delivery_movements(input.warehouse_id, &doc_items);
            apply_document_movements(&mut tx, delivery_id, DocumentType::Delivery, user_id, &plan)
                .await?;
        }

        tx.commit().await?;

        self.get(delivery_id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        input: UpdateDeliveryInput,
    ) -> AppResult<Delivery> {
        if let Some(customer) = &input.customer {
            validate_name(customer, 255).map_err(|msg| AppError::Validation {
                field: "customer".to_string(),
                message: msg.to_string(),
            })?;
        }
        if let Some(items) = &input.items {
            validate_items(items)?;
        }

        let mut tx = self.db.begin().await?;

        let current_status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM deliveries WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery".to_string()))?;

        let current: DocumentStatus = current_status.parse().map_err(AppError::Internal)?;
        let (new_status, fire_movements) =
            resolve_status_change(current, input.status, "Delivery")?;

        let warehouse_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE deliveries
            SET customer = COALESCE($1, customer),
                warehouse_id = COALESCE($2, warehouse_id),
                status = $3,
                scheduled_date = COALESCE($4, scheduled_date),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $5
            RETURNING warehouse_id
            "#,
        )
        .bind(input.customer.as_deref().map(str::trim))
        .bind(input.warehouse_id)
        .bind(new_status.as_str())
        .bind(input.scheduled_date)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(items) = &input.items {
            sqlx::query("DELETE FROM delivery_items WHERE delivery_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for item in items {
                sqlx::query(
                    "INSERT INTO delivery_items (delivery_id, product_id, quantity) VALUES ($1, $2, $3)",
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
            let plan = delivery_movements(warehouse_id, &doc_items);
            apply_document_movements(&mut tx, id, DocumentType::Delivery, user_id, &plan).await?;
        }

        tx.commit().await?;

        self.get(id).await
    }

    pub async fn validate(&self, id: Uuid, user_id: Uuid) -> AppResult<Delivery> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (String, Uuid)>(
            "SELECT status, warehouse_id FROM deliveries WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery".to_string()))?;

        let current: DocumentStatus = row.0.parse().map_err(AppError::Internal)?;
        ensure_validatable(current, "Delivery")?;

        sqlx::query(
            "UPDATE deliveries SET status = 'done', updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let doc_items = load_document_items(&mut tx, id).await?;
        let plan = delivery_movements(row.1, &doc_items);
        apply_document_movements(&mut tx, id, DocumentType::Delivery, user_id, &plan).await?;

        tx.commit().await?;

        tracing::info!(delivery_id = %id, movements = plan.len(), "Delivery validated");

        self.get(id).await
    }

    async fn items_for(
        &self,
        ids: &[Uuid],
    ) -> AppResult<std::collections::HashMap<Uuid, Vec<DeliveryItem>>> {
        #[derive(FromRow)]
        struct ItemRow {
            delivery_id: Uuid,
            id: Uuid,
            product_id: Uuid,
            product_name: String,
            sku: String,
            quantity: Decimal,
        }

        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT di.delivery_id, di.id, di.product_id, p.name as product_name,
                   p.sku, di.quantity
            FROM delivery_items di
            JOIN products p ON p.id = di.product_id
            WHERE di.delivery_id = ANY($1)
            ORDER BY p.name
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: std::collections::HashMap<Uuid, Vec<DeliveryItem>> =
            std::collections::HashMap::new();
        for row in rows {
            grouped.entry(row.delivery_id).or_default().push(DeliveryItem {
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
    delivery_id: Uuid,
) -> AppResult<Vec<DocumentItem>> {
    let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
        "SELECT product_id, quantity FROM delivery_items WHERE delivery_id = $1",
    )
    .bind(delivery_id)
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

fn build_delivery(row: DeliveryRow, items: Vec<DeliveryItem>) -> AppResult<Delivery> {
    let status: DocumentStatus = row.status.parse().map_err(AppError::Internal)?;
    Ok(Delivery {
        id: row.id,
        reference: row.reference,
        customer: row.customer,
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
