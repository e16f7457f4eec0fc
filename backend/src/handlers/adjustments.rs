//! Adjustment document handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::adjustment::{
    Adjustment, AdjustmentService, CreateAdjustmentInput, UpdateAdjustmentInput,
};
use crate::AppState;

pub async fn list_adjustments(State(state): State<AppState>) -> AppResult<Json<Vec<Adjustment>>> {
    let service = AdjustmentService::new(state.db.clone());
    let adjustments = service.list().await?;
    Ok(Json(adjustments))
}

pub async fn get_adjustment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Adjustment>> {
    let service = AdjustmentService::new(state.db.clone());
    let adjustment = service.get(id).await?;
    Ok(Json(adjustment))
}

pub async fn create_adjustment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateAdjustmentInput>,
) -> AppResult<(StatusCode, Json<Adjustment>)> {
    let service = AdjustmentService::new(state.db.clone());
    let adjustment = service.create(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

pub async fn update_adjustment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAdjustmentInput>,
) -> AppResult<Json<Adjustment>> {
    let service = AdjustmentService::new(state.db.clone());
    let adjustment = service.update(id, user.user_id, input).await?;
    Ok(Json(adjustment))
}

pub async fn validate_adjustment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Adjustment>> {
    let service = AdjustmentService::new(state.db.clone());
    let adjustment = service.validate(id, user.user_id).await?;
    Ok(Json(adjustment))
}
