//! Authentication handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::auth::{AuthResponse, AuthService, LoginInput, RegisterInput};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<Json<AuthResponse>> {
    let service = AuthService::new(state.db.clone(), state.config.jwt.clone());
    let response = service.register(input).await?;
    Ok(Json(response))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<AuthResponse>> {
    let service = AuthService::new(state.db.clone(), state.config.jwt.clone());
    let response = service.login(input).await?;
    Ok(Json(response))
}
