//! Business logic services

pub mod adjustment;
pub mod auth;
pub mod dashboard;
pub mod delivery;
pub mod document;
pub mod history;
pub mod product;
pub mod receipt;
pub mod stock;
pub mod transfer;
pub mod warehouse;

pub use adjustment::AdjustmentService;
pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use delivery::DeliveryService;
pub use history::HistoryService;
pub use product::ProductService;
pub use receipt::ReceiptService;
pub use stock::StockService;
pub use transfer::TransferService;
pub use warehouse::WarehouseService;
