//! Movement history handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::history::{HistoryFilters, HistoryService, MovementRecord};
use crate::AppState;

pub async fn list_history(
    State(state): State<AppState>,
    Query(filters): Query<HistoryFilters>,
) -> AppResult<Json<Vec<MovementRecord>>> {
    let service = HistoryService::new(state.db.clone());
    let records = service.list(filters).await?;
    Ok(Json(records))
}

pub async fn document_history(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<Vec<MovementRecord>>> {
    let service = HistoryService::new(state.db.clone());
    let records = service.for_document(document_id).await?;
    Ok(Json(records))
}
