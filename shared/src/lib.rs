//! Shared domain vocabulary for the StockFlow warehouse management system
//!
//! This crate contains the document/movement enums, the document status
//! machine, and validation helpers used by the backend and by API clients.

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::*;
