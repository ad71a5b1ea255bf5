//! # Validation Module
//!
//! Input validation utilities for SIAM.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end (CLI args, import file)                            │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: InventoryRepository                                          │
//! │  └── THIS MODULE: Business rule validation, before any mutation        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── CHECK (quantity >= 0)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use siam_core::validation::{validate_code, validate_movement_quantity};
//!
//! validate_code("7591002200046").unwrap();
//! validate_movement_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::Product;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted product code.
pub const MAX_CODE_LENGTH: usize = 128;

/// Longest accepted product name.
pub const MAX_NAME_LENGTH: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 128 characters
/// - No `/`: the code doubles as the remote document id, which is a single
///   path segment
///
/// ## Example
/// ```rust
/// use siam_core::validation::validate_code;
///
/// assert!(validate_code("7591002200046").is_ok());
/// assert!(validate_code("").is_err());
/// assert!(validate_code("a/b").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LENGTH,
        });
    }

    if code.contains('/') {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must not contain '/'".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity of an entry or exit.
///
/// Zero and negative quantities are both rejected.
///
/// ## Example
/// ```rust
/// use siam_core::validation::validate_movement_quantity;
///
/// assert!(validate_movement_quantity(1).is_ok());
/// assert!(validate_movement_quantity(0).is_err());
/// assert!(validate_movement_quantity(-3).is_err());
/// ```
pub fn validate_movement_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a stock level. Zero is a valid level.
pub fn validate_stock_level(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::Negative {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates an optional unit price.
pub fn validate_unit_price(price: Option<f64>) -> ValidationResult<()> {
    match price {
        Some(p) if !p.is_finite() => Err(ValidationError::InvalidFormat {
            field: "unit_price".to_string(),
            reason: "must be a finite number".to_string(),
        }),
        Some(p) if p < 0.0 => Err(ValidationError::Negative {
            field: "unit_price".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a product before it is registered or imported.
///
/// Checks run in field order and the first failure wins.
pub fn validate_new_product(product: &Product) -> ValidationResult<()> {
    validate_code(&product.code)?;
    validate_product_name(&product.name)?;
    validate_stock_level(product.quantity)?;
    validate_unit_price(product.unit_price)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
