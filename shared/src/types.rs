//! Common types used across the warehouse management system

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The four kinds of stock-moving documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Receipt,
    Delivery,
    Transfer,
    Adjustment,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Receipt => "receipt",
            DocumentType::Delivery => "delivery",
            DocumentType::Transfer => "transfer",
            DocumentType::Adjustment => "adjustment",
        }
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receipt" => Ok(DocumentType::Receipt),
            "delivery" => Ok(DocumentType::Delivery),
            "transfer" => Ok(DocumentType::Transfer),
            "adjustment" => Ok(DocumentType::Adjustment),
            other => Err(format!("unknown document type: {}", other)),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document lifecycle status
///
/// Any non-terminal status may move to any other status by a direct update.
/// The transition into `Done` is the one that triggers stock movements, and it
/// may happen at most once per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Waiting,
    Ready,
    Done,
    Canceled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Waiting => "waiting",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Done => "done",
            DocumentStatus::Canceled => "canceled",
        }
    }

    /// Terminal statuses accept no further edits or transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Done | DocumentStatus::Canceled)
    }

    /// Whether setting `next` on a document in this status fires movements.
    pub fn triggers_movements(&self, next: DocumentStatus) -> bool {
        next == DocumentStatus::Done && *self != DocumentStatus::Done
    }
}

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Draft
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DocumentStatus::Draft),
            "waiting" => Ok(DocumentStatus::Waiting),
            "ready" => Ok(DocumentStatus::Ready),
            "done" => Ok(DocumentStatus::Done),
            "canceled" => Ok(DocumentStatus::Canceled),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a single stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
        }
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(MovementType::In),
            "out" => Ok(MovementType::Out),
            other => Err(format!("unknown movement type: {}", other)),
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock level classification against a product's reorder level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Classify an on-hand quantity. Products without a reorder level are
    /// never low-stock, only in-stock or out-of-stock.
    pub fn classify(quantity: Decimal, reorder_level: Option<Decimal>) -> Self {
        if quantity <= Decimal::ZERO {
            return StockStatus::OutOfStock;
        }
        match reorder_level {
            Some(level) if quantity <= level => StockStatus::LowStock,
            _ => StockStatus::InStock,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

/// User roles recorded in JWT claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    InventoryManager,
    WarehouseStaff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::InventoryManager => "inventory_manager",
            UserRole::WarehouseStaff => "warehouse_staff",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inventory_manager" => Ok(UserRole::InventoryManager),
            "warehouse_staff" => Ok(UserRole::WarehouseStaff),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::Waiting,
            DocumentStatus::Ready,
            DocumentStatus::Done,
            DocumentStatus::Canceled,
        ] {
            assert_eq!(status.as_str().parse::<DocumentStatus>(), Ok(status));
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(DocumentStatus::Done.is_terminal());
        assert!(DocumentStatus::Canceled.is_terminal());
        assert!(!DocumentStatus::Draft.is_terminal());
        assert!(!DocumentStatus::Waiting.is_terminal());
        assert!(!DocumentStatus::Ready.is_terminal());
    }

    #[test]
    fn entering_done_triggers_movements_once() {
        assert!(DocumentStatus::Draft.triggers_movements(DocumentStatus::Done));
        assert!(DocumentStatus::Ready.triggers_movements(DocumentStatus::Done));
        // Re-validating a done document must never fire again
        assert!(!DocumentStatus::Done.triggers_movements(DocumentStatus::Done));
        assert!(!DocumentStatus::Draft.triggers_movements(DocumentStatus::Ready));
    }

    #[test]
    fn stock_classification() {
        let level = Some(Decimal::from(10));
        assert_eq!(
            StockStatus::classify(Decimal::ZERO, level),
            StockStatus::OutOfStock
        );
        assert_eq!(
            StockStatus::classify(Decimal::from(5), level),
            StockStatus::LowStock
        );
        assert_eq!(
            StockStatus::classify(Decimal::from(10), level),
            StockStatus::LowStock
        );
        assert_eq!(
            StockStatus::classify(Decimal::from(11), level),
            StockStatus::InStock
        );
        // No reorder level: never low stock
        assert_eq!(
            StockStatus::classify(Decimal::from(1), None),
            StockStatus::InStock
        );
    }
}
