//! Stock level handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::stock::{
    LowStockAlert, ProductStockSummary, StockFilters, StockLevel, StockOverviewRow, StockService,
    WarehouseStockSummary,
};
use crate::AppState;

pub async fn list_stock(
    State(state): State<AppState>,
    Query(filters): Query<StockFilters>,
) -> AppResult<Json<Vec<StockOverviewRow>>> {
    let service = StockService::new(state.db.clone());
    let stock = service.list_stock(filters).await?;
    Ok(Json(stock))
}

pub async fn get_stock(
    State(state): State<AppState>,
    Path((product_id, warehouse_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<StockLevel>> {
    let service = StockService::new(state.db.clone());
    let level = service.get_stock(product_id, warehouse_id).await?;
    Ok(Json(level))
}

pub async fn warehouse_summary(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<WarehouseStockSummary>> {
    let service = StockService::new(state.db.clone());
    let summary = service.warehouse_summary(warehouse_id).await?;
    Ok(Json(summary))
}

pub async fn product_summary(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductStockSummary>> {
    let service = StockService::new(state.db.clone());
    let summary = service.product_summary(product_id).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub warehouse_id: Option<Uuid>,
}

pub async fn low_stock_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<Vec<LowStockAlert>>> {
    let service = StockService::new(state.db.clone());
    let alerts = service.low_stock_alerts(query.warehouse_id).await?;
    Ok(Json(alerts))
}
