//! Movement history service: read-only access to the stock ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

/// History queries are capped so an unfiltered listing stays bounded.
const HISTORY_LIMIT: i64 = 1000;

#[derive(Clone)]
pub struct HistoryService {
    db: PgPool,
}

/// A ledger entry with display names joined in
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MovementRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub warehouse_id: Uuid,
    pub warehouse_name: Option<String>,
    pub document_id: Uuid,
    pub document_type: String,
    pub quantity: Decimal,
    pub quantity_before: Decimal,
    pub quantity_after: Decimal,
    pub movement_type: String,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Optional filters for history queries
#[derive(Debug, Default, Deserialize)]
pub struct HistoryFilters {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub document_type: Option<String>,
    pub movement_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl HistoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List ledger entries most recent first, optionally filtered.
    pub async fn list(&self, filters: HistoryFilters) -> AppResult<Vec<MovementRecord>> {
        let records = sqlx::query_as::<_, MovementRecord>(
            r#"
            SELECT m.id, m.product_id, p.name as product_name, p.sku,
                   m.warehouse_id, w.name as warehouse_name,
                   m.document_id, m.document_type, m.quantity,
                   m.quantity_before, m.quantity_after, m.movement_type,
                   m.user_id, u.name as user_name, m.timestamp
            FROM move_history m
            LEFT JOIN products p ON p.id = m.product_id
            LEFT JOIN warehouses w ON w.id = m.warehouse_id
            LEFT JOIN users u ON u.id = m.user_id
            WHERE ($1::uuid IS NULL OR m.product_id = $1)
              AND ($2::uuid IS NULL OR m.warehouse_id = $2)
              AND ($3::text IS NULL OR m.document_type = $3)
              AND ($4::text IS NULL OR m.movement_type = $4)
              AND ($5::timestamptz IS NULL OR m.timestamp >= $5)
              AND ($6::timestamptz IS NULL OR m.timestamp <= $6)
            ORDER BY m.timestamp DESC
            LIMIT $7
            "#,
        )
        .bind(filters.product_id)
        .bind(filters.warehouse_id)
        .bind(filters.document_type)
        .bind(filters.movement_type)
        .bind(filters.from)
        .bind(filters.to)
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }

    /// All ledger entries for one document, oldest first.
    pub async fn for_document(&self, document_id: Uuid) -> AppResult<Vec<MovementRecord>> {
        let records = sqlx::query_as::<_, MovementRecord>(
            r#"
            SELECT m.id, m.product_id, p.name as product_name, p.sku,
                   m.warehouse_id, w.name as warehouse_name,
                   m.document_id, m.document_type, m.quantity,
                   m.quantity_before, m.quantity_after, m.movement_type,
                   m.user_id, u.name as user_name, m.timestamp
            FROM move_history m
            LEFT JOIN products p ON p.id = m.product_id
            LEFT JOIN warehouses w ON w.id = m.warehouse_id
            LEFT JOIN users u ON u.id = m.user_id
            WHERE m.document_id = $1
            ORDER BY m.timestamp ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }
}
