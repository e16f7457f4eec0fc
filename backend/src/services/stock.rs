//! Stock movement engine and stock level queries
//!
//! Every change to on-hand quantity goes through [`apply_movement_tx`]: a
//! transactional read of the current quantity, the clamped update, and the
//! append of an immutable ledger entry, committed as one unit of work. No
//! other component writes `product_stocks` or `move_history`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::types::{DocumentType, MovementType, StockStatus};
use shared::validation::validate_quantity;

use crate::error::{AppError, AppResult};

/// Stock service: the single writer of stock levels and the movement ledger
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// A requested quantity change for one (product, warehouse) pair
#[derive(Debug, Clone)]
pub struct MovementInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub document_id: Uuid,
    pub document_type: DocumentType,
    pub movement_type: MovementType,
    pub user_id: Uuid,
}

/// A committed ledger entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMove {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub document_id: Uuid,
    pub document_type: String,
    /// Signed requested delta: +quantity for in, -quantity for out. Kept as
    /// requested even when the zero floor clamps the stored quantity, so the
    /// ledger shows what was asked for.
    pub quantity: Decimal,
    pub quantity_before: Decimal,
    pub quantity_after: Decimal,
    pub movement_type: String,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// On-hand quantity for a (product, warehouse) pair
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Stock row enriched with product and warehouse context
#[derive(Debug, Clone, Serialize)]
pub struct StockOverviewRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub category: Option<String>,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub quantity: Decimal,
    pub reorder_level: Option<Decimal>,
    pub reorder_quantity: Option<Decimal>,
    pub stock_status: StockStatus,
}

#[derive(Debug, FromRow)]
struct StockOverviewDbRow {
    product_id: Uuid,
    product_name: String,
    sku: String,
    category: Option<String>,
    warehouse_id: Uuid,
    warehouse_name: String,
    quantity: Decimal,
    reorder_level: Option<Decimal>,
    reorder_quantity: Option<Decimal>,
}

/// Filters for the stock overview listing
#[derive(Debug, Default, Deserialize)]
pub struct StockFilters {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub category: Option<String>,
    pub low_stock: Option<bool>,
    pub out_of_stock: Option<bool>,
}

/// Aggregate stock figures for one warehouse
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WarehouseStockSummary {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub total_products: i64,
    pub products_in_stock: i64,
    pub products_out_of_stock: i64,
    pub total_quantity: Decimal,
}

/// Stock for one product across all warehouses
#[derive(Debug, Clone, Serialize)]
pub struct ProductStockSummary {
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub total_quantity: Decimal,
    pub warehouses: Vec<ProductWarehouseStock>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductWarehouseStock {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub quantity: Decimal,
}

/// A product whose total stock has fallen to or below its reorder level
#[derive(Debug, Clone, Serialize)]
pub struct LowStockAlert {
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub total_quantity: Decimal,
    pub reorder_level: Decimal,
    pub reorder_quantity: Option<Decimal>,
    pub stock_status: StockStatus,
}

#[derive(Debug, FromRow)]
struct LowStockDbRow {
    product_id: Uuid,
    product_name: String,
    sku: String,
    total_quantity: Decimal,
    reorder_level: Decimal,
    reorder_quantity: Option<Decimal>,
}

/// Compute the stored quantity after a movement. Decreases clamp at zero.
pub fn next_quantity(before: Decimal, quantity: Decimal, movement: MovementType) -> Decimal {
    match movement {
        MovementType::In => before + quantity,
        MovementType::Out => Decimal::ZERO.max(before - quantity),
    }
}

/// The delta recorded in the ledger: the requested magnitude with its sign,
/// independent of any clamping of the stored quantity.
pub fn signed_delta(quantity: Decimal, movement: MovementType) -> Decimal {
    match movement {
        MovementType::In => quantity,
        MovementType::Out => -quantity,
    }
}

/// Apply one movement inside the caller's transaction.
///
/// The `FOR UPDATE` read serializes concurrent movements on the same
/// (product, warehouse) key; movements on distinct keys do not contend.
/// The stock upsert and the ledger append commit or roll back together with
/// whatever else the caller has staged.
pub async fn apply_movement_tx(
    tx: &mut Transaction<'_, Postgres>,
    input: &MovementInput,
) -> AppResult<StockMove> {
    validate_quantity(input.quantity)
        .map_err(|msg| AppError::InvalidQuantity(msg.to_string()))?;

    // Current quantity, absent row means zero
    let quantity_before = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT quantity FROM product_stocks
        WHERE product_id = $1 AND warehouse_id = $2
        FOR UPDATE
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .fetch_optional(&mut **tx)
    .await?
    .unwrap_or(Decimal::ZERO);

    let quantity_after = next_quantity(quantity_before, input.quantity, input.movement_type);

    sqlx::query(
        r#"
        INSERT INTO product_stocks (product_id, warehouse_id, quantity, updated_at)
        VALUES ($1, $2, $3, CURRENT_TIMESTAMP)
        ON CONFLICT (product_id, warehouse_id)
        DO UPDATE SET quantity = $3, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .bind(quantity_after)
    .execute(&mut **tx)
    .await?;

    let entry = sqlx::query_as::<_, StockMove>(
        r#"
        INSERT INTO move_history (
            product_id, warehouse_id, document_id, document_type,
            quantity, quantity_before, quantity_after, movement_type, user_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, product_id, warehouse_id, document_id, document_type,
                  quantity, quantity_before, quantity_after, movement_type,
                  user_id, timestamp
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .bind(input.document_id)
    .bind(input.document_type.as_str())
    .bind(signed_delta(input.quantity, input.movement_type))
    .bind(quantity_before)
    .bind(quantity_after)
    .bind(input.movement_type.as_str())
    .bind(input.user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(entry)
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply a single movement as its own unit of work
    pub async fn apply_movement(&self, input: MovementInput) -> AppResult<StockMove> {
        let mut tx = self.db.begin().await?;
        let entry = apply_movement_tx(&mut tx, &input).await?;
        tx.commit().await?;

        tracing::debug!(
            product_id = %input.product_id,
            warehouse_id = %input.warehouse_id,
            movement = %input.movement_type,
            before = %entry.quantity_before,
            after = %entry.quantity_after,
            "Movement applied"
        );

        Ok(entry)
    }

    /// Get the stock level for one (product, warehouse) pair; absent rows
    /// read as zero.
    pub async fn get_stock(&self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<StockLevel> {
        let row = sqlx::query_as::<_, (Decimal, DateTime<Utc>)>(
            r#"
            SELECT quantity, updated_at FROM product_stocks
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(match row {
            Some((quantity, updated_at)) => StockLevel {
                product_id,
                warehouse_id,
                quantity,
                updated_at: Some(updated_at),
            },
            None => StockLevel {
                product_id,
                warehouse_id,
                quantity: Decimal::ZERO,
                updated_at: None,
            },
        })
    }

    /// List stock rows with product/warehouse context and a derived status
    pub async fn list_stock(&self, filters: StockFilters) -> AppResult<Vec<StockOverviewRow>> {
        let rows = sqlx::query_as::<_, StockOverviewDbRow>(
            r#"
            SELECT ps.product_id, p.name as product_name, p.sku, p.category,
                   ps.warehouse_id, w.name as warehouse_name, ps.quantity,
                   p.reorder_level, p.reorder_quantity
            FROM product_stocks ps
            JOIN products p ON p.id = ps.product_id
            JOIN warehouses w ON w.id = ps.warehouse_id
            WHERE ($1::uuid IS NULL OR ps.product_id = $1)
              AND ($2::uuid IS NULL OR ps.warehouse_id = $2)
              AND ($3::text IS NULL OR p.category = $3)
            ORDER BY p.name, w.name
            "#,
        )
        .bind(filters.product_id)
        .bind(filters.warehouse_id)
        .bind(filters.category.as_deref())
        .fetch_all(&self.db)
        .await?;

        let low_only = filters.low_stock.unwrap_or(false);
        let out_only = filters.out_of_stock.unwrap_or(false);

        Ok(rows
            .into_iter()
            .map(|r| {
                let stock_status = StockStatus::classify(r.quantity, r.reorder_level);
                StockOverviewRow {
                    product_id: r.product_id,
                    product_name: r.product_name,
                    sku: r.sku,
                    category: r.category,
                    warehouse_id: r.warehouse_id,
                    warehouse_name: r.warehouse_name,
                    quantity: r.quantity,
                    reorder_level: r.reorder_level,
                    reorder_quantity: r.reorder_quantity,
                    stock_status,
                }
            })
            .filter(|r| {
                if low_only && r.stock_status != StockStatus::LowStock {
                    return false;
                }
                if out_only && r.stock_status != StockStatus::OutOfStock {
                    return false;
                }
                true
            })
            .collect())
    }

    /// Aggregate stock figures for one warehouse
    pub async fn warehouse_summary(&self, warehouse_id: Uuid) -> AppResult<WarehouseStockSummary> {
        sqlx::query_as::<_, WarehouseStockSummary>(
            r#"
            SELECT w.id as warehouse_id,
                   w.name as warehouse_name,
                   COUNT(ps.product_id) as total_products,
                   COUNT(CASE WHEN ps.quantity > 0 THEN 1 END) as products_in_stock,
                   COUNT(CASE WHEN ps.quantity = 0 THEN 1 END) as products_out_of_stock,
                   COALESCE(SUM(ps.quantity), 0) as total_quantity
            FROM warehouses w
            LEFT JOIN product_stocks ps ON ps.warehouse_id = w.id
            WHERE w.id = $1
            GROUP BY w.id, w.name
            "#,
        )
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    /// Stock for one product across all warehouses
    pub async fn product_summary(&self, product_id: Uuid) -> AppResult<ProductStockSummary> {
        let product = sqlx::query_as::<_, (String, String)>(
            "SELECT name, sku FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let warehouses = sqlx::query_as::<_, ProductWarehouseStock>(
            r#"
            SELECT ps.warehouse_id, w.name as warehouse_name, ps.quantity
            FROM product_stocks ps
            JOIN warehouses w ON w.id = ps.warehouse_id
            WHERE ps.product_id = $1
            ORDER BY w.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        let total_quantity = warehouses.iter().map(|w| w.quantity).sum();

        Ok(ProductStockSummary {
            product_id,
            product_name: product.0,
            sku: product.1,
            total_quantity,
            warehouses,
        })
    }

    /// Products whose total stock is at or below their reorder level
    pub async fn low_stock_alerts(
        &self,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Vec<LowStockAlert>> {
        let rows = sqlx::query_as::<_, LowStockDbRow>(
            r#"
            SELECT p.id as product_id, p.name as product_name, p.sku,
                   COALESCE(SUM(ps.quantity), 0) as total_quantity,
                   p.reorder_level, p.reorder_quantity
            FROM products p
            LEFT JOIN product_stocks ps ON ps.product_id = p.id
                AND ($1::uuid IS NULL OR ps.warehouse_id = $1)
            WHERE p.reorder_level IS NOT NULL
            GROUP BY p.id, p.name, p.sku, p.reorder_level, p.reorder_quantity
            HAVING COALESCE(SUM(ps.quantity), 0) <= p.reorder_level
            ORDER BY total_quantity ASC
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let stock_status = StockStatus::classify(r.total_quantity, Some(r.reorder_level));
                LowStockAlert {
                    product_id: r.product_id,
                    product_name: r.product_name,
                    sku: r.sku,
                    total_quantity: r.total_quantity,
                    reorder_level: r.reorder_level,
                    reorder_quantity: r.reorder_quantity,
                    stock_status,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn inbound_adds() {
        assert_eq!(next_quantity(dec(0), dec(10), MovementType::In), dec(10));
        assert_eq!(next_quantity(dec(5), dec(3), MovementType::In), dec(8));
    }

    #[test]
    fn outbound_subtracts_and_clamps_at_zero() {
        assert_eq!(next_quantity(dec(10), dec(3), MovementType::Out), dec(7));
        assert_eq!(next_quantity(dec(5), dec(8), MovementType::Out), dec(0));
        assert_eq!(next_quantity(dec(0), dec(1), MovementType::Out), dec(0));
    }

    #[test]
    fn recorded_delta_keeps_requested_magnitude() {
        // Even when clamping truncates the stored quantity, the ledger delta
        // is the requested amount with its sign.
        assert_eq!(signed_delta(dec(8), MovementType::Out), dec(-8));
        assert_eq!(signed_delta(dec(10), MovementType::In), dec(10));
    }
}
