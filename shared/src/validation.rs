//! Validation helpers shared by the backend and API clients

use rust_decimal::Decimal;

/// Movement quantities must be non-negative.
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Quantity must not be negative");
    }
    Ok(())
}

/// Reorder levels and quantities, when present, must be non-negative.
pub fn validate_reorder_value(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Reorder values must not be negative");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate a required name-like field with a maximum length.
pub fn validate_name(value: &str, max_len: usize) -> Result<(), &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Value must not be empty");
    }
    if trimmed.len() > max_len {
        return Err("Value exceeds maximum length");
    }
    Ok(())
}

/// Validate a SKU: non-empty, at most 100 characters.
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    validate_name(sku, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_rejects_negative() {
        assert!(validate_quantity(Decimal::from(-1)).is_err());
        assert!(validate_quantity(Decimal::ZERO).is_ok());
        assert!(validate_quantity(Decimal::from(10)).is_ok());
    }

    #[test]
    fn name_limits() {
        assert!(validate_name("Main Warehouse", 255).is_ok());
        assert!(validate_name("   ", 255).is_err());
        assert!(validate_name(&"x".repeat(300), 255).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("ops@example.com").is_ok());
        assert!(validate_email("nope").is_err());
    }
}
