//! API route definitions

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::middleware::auth_middleware;
use crate::AppState;

/// All API v1 routes. Everything except authentication requires a valid
/// bearer token.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/warehouses", warehouse_routes())
        .nest("/stock", stock_routes())
        .nest("/receipts", receipt_routes())
        .nest("/deliveries", delivery_routes())
        .nest("/transfers", transfer_routes())
        .nest("/adjustments", adjustment_routes())
        .nest("/history", history_routes())
        .nest("/dashboard", dashboard_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::deactivate_product),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::warehouses::list_warehouses).post(handlers::warehouses::create_warehouse),
        )
        .route(
            "/:id",
            get(handlers::warehouses::get_warehouse)
                .put(handlers::warehouses::update_warehouse)
                .delete(handlers::warehouses::delete_warehouse),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::stock::list_stock))
        .route("/alerts", get(handlers::stock::low_stock_alerts))
        .route(
            "/products/:product_id/warehouses/:warehouse_id",
            get(handlers::stock::get_stock),
        )
        .route(
            "/warehouses/:warehouse_id",
            get(handlers::stock::warehouse_summary),
        )
        .route("/products/:product_id", get(handlers::stock::product_summary))
        .route_layer(middleware::from_fn(auth_middleware))
}

fn receipt_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::receipts::list_receipts).post(handlers::receipts::create_receipt),
        )
        .route(
            "/:id",
            get(handlers::receipts::get_receipt).put(handlers::receipts::update_receipt),
        )
        .route("/:id/validate", post(handlers::receipts::validate_receipt))
        .route_layer(middleware::from_fn(auth_middleware))
}

fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::deliveries::list_deliveries).post(handlers::deliveries::create_delivery),
        )
        .route(
            "/:id",
            get(handlers::deliveries::get_delivery).put(handlers::deliveries::update_delivery),
        )
        .route(
            "/:id/validate",
            post(handlers::deliveries::validate_delivery),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::transfers::list_transfers).post(handlers::transfers::create_transfer),
        )
        .route(
            "/:id",
            get(handlers::transfers::get_transfer).put(handlers::transfers::update_transfer),
        )
        .route(
            "/:id/validate",
            post(handlers::transfers::validate_transfer),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn adjustment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::adjustments::list_adjustments)
                .post(handlers::adjustments::create_adjustment),
        )
        .route(
            "/:id",
            get(handlers::adjustments::get_adjustment).put(handlers::adjustments::update_adjustment),
        )
        .route(
            "/:id/validate",
            post(handlers::adjustments::validate_adjustment),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::history::list_history))
        .route(
            "/documents/:document_id",
            get(handlers::history::document_history),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/kpis", get(handlers::dashboard::get_kpis))
        .route("/overview", get(handlers::dashboard::get_overview))
        .route_layer(middleware::from_fn(auth_middleware))
}
