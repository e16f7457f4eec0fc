//! Receipt document handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::receipt::{CreateReceiptInput, Receipt, ReceiptService, UpdateReceiptInput};
use crate::AppState;

pub async fn list_receipts(State(state): State<AppState>) -> AppResult<Json<Vec<Receipt>>> {
    let service = ReceiptService::new(state.db.clone());
    let receipts = service.list().await?;
    Ok(Json(receipts))
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Receipt>> {
    let service = ReceiptService::new(state.db.clone());
    let receipt = service.get(id).await?;
    Ok(Json(receipt))
}

pub async fn create_receipt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateReceiptInput>,
) -> AppResult<(StatusCode, Json<Receipt>)> {
    let service = ReceiptService::new(state.db.clone());
    let receipt = service.create(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn update_receipt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateReceiptInput>,
) -> AppResult<Json<Receipt>> {
    let service = ReceiptService::new(state.db.clone());
    let receipt = service.update(id, user.user_id, input).await?;
    Ok(Json(receipt))
}

pub async fn validate_receipt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Receipt>> {
    let service = ReceiptService::new(state.db.clone());
    let receipt = service.validate(id, user.user_id).await?;
    Ok(Json(receipt))
}
