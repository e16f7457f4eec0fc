//! HTTP request handlers

pub mod adjustments;
pub mod auth;
pub mod dashboard;
pub mod deliveries;
pub mod health;
pub mod history;
pub mod products;
pub mod receipts;
pub mod stock;
pub mod transfers;
pub mod warehouses;

pub use health::health_check;
