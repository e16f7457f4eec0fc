//! Transfer document handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::transfer::{
    CreateTransferInput, Transfer, TransferService, UpdateTransferInput,
};
use crate::AppState;

pub async fn list_transfers(State(state): State<AppState>) -> AppResult<Json<Vec<Transfer>>> {
    let service = TransferService::new(state.db.clone());
    let transfers = service.list().await?;
    Ok(Json(transfers))
}

pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Transfer>> {
    let service = TransferService::new(state.db.clone());
    let transfer = service.get(id).await?;
    Ok(Json(transfer))
}

pub async fn create_transfer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateTransferInput>,
) -> AppResult<(StatusCode, Json<Transfer>)> {
    let service = TransferService::new(state.db.clone());
    let transfer = service.create(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

pub async fn update_transfer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTransferInput>,
) -> AppResult<Json<Transfer>> {
    let service = TransferService::new(state.db.clone());
    let transfer = service.update(id, user.user_id, input).await?;
    Ok(Json(transfer))
}

pub async fn validate_transfer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Transfer>> {
    let service = TransferService::new(state.db.clone());
    let transfer = service.validate(id, user.user_id).await?;
    Ok(Json(transfer))
}
