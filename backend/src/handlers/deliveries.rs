//! Delivery document handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::delivery::{
    CreateDeliveryInput, Delivery, DeliveryService, UpdateDeliveryInput,
};
use crate::AppState;

pub async fn list_deliveries(State(state): State<AppState>) -> AppResult<Json<Vec<Delivery>>> {
    let service = DeliveryService::new(state.db.clone());
    let deliveries = service.list().await?;
    Ok(Json(deliveries))
}

pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Delivery>> {
    let service = DeliveryService::new(state.db.clone());
    let delivery = service.get(id).await?;
    Ok(Json(delivery))
}

pub async fn create_delivery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateDeliveryInput>,
) -> AppResult<(StatusCode, Json<Delivery>)> {
    let service = DeliveryService::new(state.db.clone());
    let delivery = service.create(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

pub async fn update_delivery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateDeliveryInput>,
) -> AppResult<Json<Delivery>> {
    let service = DeliveryService::new(state.db.clone());
    let delivery = service.update(id, user.user_id, input).await?;
    Ok(Json(delivery))
}

pub async fn validate_delivery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Delivery>> {
    let service = DeliveryService::new(state.db.clone());
    let delivery = service.validate(id, user.user_id).await?;
    Ok(Json(delivery))
}
