//! Dashboard handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::dashboard::{DashboardKpis, DashboardOverview, DashboardService};
use crate::AppState;

pub async fn get_kpis(State(state): State<AppState>) -> AppResult<Json<DashboardKpis>> {
    let service = DashboardService::new(state.db.clone());
    let kpis = service.kpis().await?;
    Ok(Json(kpis))
}

pub async fn get_overview(State(state): State<AppState>) -> AppResult<Json<DashboardOverview>> {
    let service = DashboardService::new(state.db.clone());
    let overview = service.overview().await?;
    Ok(Json(overview))
}
