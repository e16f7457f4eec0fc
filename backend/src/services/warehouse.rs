//! Warehouse management service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::validation::validate_name;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Warehouse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseInput {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWarehouseInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl WarehouseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            "SELECT id, code, name, address, created_at, updated_at FROM warehouses ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(warehouses)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Warehouse> {
        sqlx::query_as::<_, Warehouse>(
            "SELECT id, code, name, address, created_at, updated_at FROM warehouses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    pub async fn create(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        validate_name(&input.code, 16).map_err(|msg| AppError::Validation {
            field: "code".to_string(),
            message: msg.to_string(),
        })?;
        validate_name(&input.name, 255).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE code = $1)",
        )
        .bind(input.code.trim())
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }

        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouses (code, name, address)
            VALUES ($1, $2, $3)
            RETURNING id, code, name, address, created_at, updated_at
            "#,
        )
        .bind(input.code.trim())
        .bind(input.name.trim())
        .bind(input.address)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(warehouse_id = %warehouse.id, code = %warehouse.code, "Warehouse created");

        Ok(warehouse)
    }

    pub async fn update(&self, id: Uuid, input: UpdateWarehouseInput) -> AppResult<Warehouse> {
        if let Some(name) = &input.name {
            validate_name(name, 255).map_err(|msg| AppError::Validation {
                field: "name".to_string(),
                message: msg.to_string(),
            })?;
        }

        sqlx::query_as::<_, Warehouse>(
            r#"
            UPDATE warehouses
            SET code = COALESCE($1, code),
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING id, code, name, address, created_at, updated_at
            "#,
        )
        .bind(input.code.as_deref().map(str::trim))
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.address)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    /// Delete a warehouse. Refused while any stock or ledger entry still
    /// references it.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM product_stocks WHERE warehouse_id = $1)
                OR EXISTS(SELECT 1 FROM move_history WHERE warehouse_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if referenced {
            return Err(AppError::Validation {
                field: "warehouse_id".to_string(),
                message: "Warehouse still has stock or movement history".to_string(),
            });
        }

        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        Ok(())
    }
}
