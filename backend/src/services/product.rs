//! Product catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::validation::{validate_name, validate_reorder_value, validate_sku};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub cost_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub reorder_level: Option<Decimal>,
    pub reorder_quantity: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub cost_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub reorder_level: Option<Decimal>,
    pub reorder_quantity: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub cost_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub reorder_level: Option<Decimal>,
    pub reorder_quantity: Option<Decimal>,
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List active products, optionally filtered by category or a search
    /// term over name and SKU.
    pub async fn list(
        &self,
        category: Option<String>,
        search: Option<String>,
    ) -> AppResult<Vec<Product>> {
        let pattern = search.map(|s| format!("%{}%", s));

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, category, unit,
                   cost_price, sale_price, reorder_level, reorder_quantity,
                   active, created_at, updated_at
            FROM products
            WHERE active = true
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)
            ORDER BY name
            "#,
        )
        .bind(category)
        .bind(pattern)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, category, unit,
                   cost_price, sale_price, reorder_level, reorder_quantity,
                   active, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        validate_sku(&input.sku).map_err(|msg| AppError::Validation {
            field: "sku".to_string(),
            message: msg.to_string(),
        })?;
        validate_name(&input.name, 255).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;
        if let Some(reorder_level) = input.reorder_level {
            validate_reorder_value(reorder_level).map_err(|msg| AppError::Validation {
                field: "reorder_level".to_string(),
                message: msg.to_string(),
            })?;
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)",
        )
        .bind(input.sku.trim())
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (sku, name, description, category, unit,
                                  cost_price, sale_price, reorder_level, reorder_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, sku, name, description, category, unit,
                      cost_price, sale_price, reorder_level, reorder_quantity,
                      active, created_at, updated_at
            "#,
        )
        .bind(input.sku.trim())
        .bind(input.name.trim())
        .bind(input.description)
        .bind(input.category)
        .bind(input.unit.unwrap_or_else(|| "unit".to_string()))
        .bind(input.cost_price)
        .bind(input.sale_price)
        .bind(input.reorder_level)
        .bind(input.reorder_quantity)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");

        Ok(product)
    }

    pub async fn update(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        if let Some(name) = &input.name {
            validate_name(name, 255).map_err(|msg| AppError::Validation {
                field: "name".to_string(),
                message: msg.to_string(),
            })?;
        }
        if let Some(reorder_level) = input.reorder_level {
            validate_reorder_value(reorder_level).map_err(|msg| AppError::Validation {
                field: "reorder_level".to_string(),
                message: msg.to_string(),
            })?;
        }

        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = COALESCE($1, name),
                description = COALESCE($2, description),
                category = COALESCE($3, category),
                unit = COALESCE($4, unit),
                cost_price = COALESCE($5, cost_price),
                sale_price = COALESCE($6, sale_price),
                reorder_level = COALESCE($7, reorder_level),
                reorder_quantity = COALESCE($8, reorder_quantity),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $9
            RETURNING id, sku, name, description, category, unit,
                      cost_price, sale_price, reorder_level, reorder_quantity,
                      active, created_at, updated_at
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.description)
        .bind(input.category)
        .bind(input.unit)
        .bind(input.cost_price)
        .bind(input.sale_price)
        .bind(input.reorder_level)
        .bind(input.reorder_quantity)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Deactivate a product. Ledger entries reference products forever, so
    /// rows are never deleted outright.
    pub async fn deactivate(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE products SET active = false, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(())
    }
}
