//! # Domain Types
//!
//! Core domain types used throughout SIAM.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────┐      │
//! │  │    Product      │   │    Movement     │   │ PendingOperation │      │
//! │  │  ─────────────  │   │  ─────────────  │   │  ──────────────  │      │
//! │  │  code (PK)      │   │  id (UUID)      │   │  id (monotonic)  │      │
//! │  │  name           │   │  code           │   │  kind            │      │
//! │  │  quantity ≥ 0   │   │  kind           │   │  collection      │      │
//! │  │  extra_fields   │   │  quantity > 0   │   │  payload (JSON)  │      │
//! │  └─────────────────┘   └─────────────────┘   └──────────────────┘      │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────┐      │
//! │  │  MovementKind   │   │  OperationKind  │   │   StockChange    │      │
//! │  │  Entry / Exit   │   │  Create/Update  │   │  before / after  │      │
//! │  │                 │   │  Delete/Movement│   │  RemoteWrite     │      │
//! │  └─────────────────┘   └─────────────────┘   └──────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Products are keyed by their scanned `code` everywhere: the cache primary
//! key, the remote document id and the pending payloads all use it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::validate_movement_quantity;
use crate::DEFAULT_UNIT;

/// Open-ended fields that have no dedicated column.
pub type ExtraFields = BTreeMap<String, Value>;

// =============================================================================
// Product
// =============================================================================

/// One inventory line item.
///
/// ## Serialization
/// Unknown keys are collected into `extra_fields` through `#[serde(flatten)]`,
/// which is how import files and pending payloads keep attributes such as
/// `min_stock` or `expiration_date` without a schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Scanned barcode or internal code. Primary key.
    pub code: String,

    /// Display name.
    pub name: String,

    #[serde(default)]
    pub category: String,

    /// Units on hand. Never negative.
    #[serde(default)]
    pub quantity: i64,

    #[serde(default = "default_unit")]
    pub unit: String,

    /// Shelf or warehouse location.
    #[serde(default)]
    pub location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// When the cache row was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_timestamp: Option<DateTime<Utc>>,

    /// Everything else.
    #[serde(flatten)]
    pub extra_fields: ExtraFields,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

impl Product {
    /// Creates a product with zero stock and default attributes.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Product {
            code: code.into(),
            name: name.into(),
            category: String::new(),
            quantity: 0,
            unit: default_unit(),
            location: String::new(),
            unit_price: None,
            image_url: None,
            last_sync_timestamp: None,
            extra_fields: ExtraFields::new(),
        }
    }

    /// Computes the stock level after a movement, enforcing the stock rules.
    ///
    /// ## Rules (checked in order)
    /// 1. `quantity <= 0` → validation error, nothing else is looked at
    /// 2. Exit larger than stock on hand → `InsufficientStock`
    /// 3. Entry overflowing `i64` → validation error
    pub fn apply_movement(&self, kind: MovementKind, quantity: i64) -> CoreResult<i64> {
        validate_movement_quantity(quantity)?;

        match kind.apply(self.quantity, quantity) {
            Some(new_quantity) => Ok(new_quantity),
            None if kind == MovementKind::Exit => Err(CoreError::InsufficientStock {
                code: self.code.clone(),
                available: self.quantity,
                requested: quantity,
            }),
            None => Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: i64::MAX - self.quantity,
            }
            .into()),
        }
    }

    /// Reads an integer extra field.
    ///
    /// Accepts JSON numbers and numeric strings, since spreadsheet imports
    /// often carry numbers as text.
    pub fn extra_i64(&self, key: &str) -> Option<i64> {
        match self.extra_fields.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads a string extra field.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra_fields.get(key).and_then(Value::as_str)
    }
}

// =============================================================================
// Movements
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock arriving. Adds to the quantity on hand.
    Entry,
    /// Stock leaving. Subtracts from the quantity on hand.
    Exit,
}

impl MovementKind {
    /// Applies this movement to a stock level.
    ///
    /// Returns `None` when an exit exceeds the stock on hand or an entry
    /// overflows.
    pub fn apply(self, on_hand: i64, quantity: i64) -> Option<i64> {
        match self {
            MovementKind::Entry => on_hand.checked_add(quantity),
            MovementKind::Exit if quantity <= on_hand => Some(on_hand - quantity),
            MovementKind::Exit => None,
        }
    }

    /// Wire and storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
        }
    }

    /// Capitalized name for user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            MovementKind::Entry => "Entry",
            MovementKind::Exit => "Exit",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entry" | "in" => Ok(MovementKind::Entry),
            "exit" | "out" => Ok(MovementKind::Exit),
            other => Err(ValidationError::InvalidFormat {
                field: "kind".to_string(),
                reason: format!("unknown movement kind '{}'", other),
            }),
        }
    }
}

/// An immutable entry or exit event.
///
/// ## Identity
/// `id` is generated once, when the movement happens, and is reused as the
/// remote document id. Replaying the same movement therefore lands on the
/// same document instead of duplicating history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: String,
    pub code: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub user: String,
    #[serde(default)]
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

impl Movement {
    /// Creates a movement stamped with a fresh id and the current time.
    pub fn new(
        code: impl Into<String>,
        kind: MovementKind,
        quantity: i64,
        user: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Movement {
            id: Uuid::new_v4().to_string(),
            code: code.into(),
            kind,
            quantity,
            user: user.into(),
            notes: notes.into(),
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Pending Operations
// =============================================================================

/// What a queued write intends to do remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Create a product document.
    Create,
    /// Overwrite a product's quantity.
    Update,
    /// Delete a product document.
    Delete,
    /// Push a quantity change plus its movement record.
    Movement,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Movement => "movement",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(OperationKind::Create),
            "update" => Ok(OperationKind::Update),
            "delete" => Ok(OperationKind::Delete),
            "movement" => Ok(OperationKind::Movement),
            other => Err(ValidationError::InvalidFormat {
                field: "operation_kind".to_string(),
                reason: format!("unknown operation '{}'", other),
            }),
        }
    }
}

/// A write that succeeded locally but is not yet confirmed remotely.
///
/// Entries are only ever removed after a confirmed remote apply. The one
/// in-place change allowed is recording a failed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Monotonic queue id.
    pub id: i64,
    pub kind: OperationKind,
    /// Remote collection the write targets.
    pub collection: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub attempt_count: i64,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Results and Snapshots
// =============================================================================

/// Cache size snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_products: i64,
    pub pending_count: i64,
}

/// What happened to the remote half of a local write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteWrite {
    /// The remote store confirmed the write.
    Synced,
    /// The write is waiting in the pending queue.
    Queued,
    /// Neither confirmed nor queued; only the cache has it.
    LocalOnly,
}

/// Outcome of a successful entry or exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockChange {
    pub code: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub remote: RemoteWrite,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn toner(quantity: i64) -> Product {
        Product {
            quantity,
            ..Product::new("7591002200046", "Toner HP 12A")
        }
    }

    #[test]
    fn test_new_product_defaults() {
        let product = Product::new("A1", "Widget");
        assert_eq!(product.quantity, 0);
        assert_eq!(product.unit, "units");
        assert!(product.extra_fields.is_empty());
    }

    #[test]
    fn test_entry_adds_stock() {
        assert_eq!(toner(3).apply_movement(MovementKind::Entry, 5).unwrap(), 8);
    }

    #[test]
    fn test_exit_cannot_go_negative() {
        let err = toner(10).apply_movement(MovementKind::Exit, 15).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 10);
                assert_eq!(requested, 15);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Taking everything is allowed
        assert_eq!(toner(10).apply_movement(MovementKind::Exit, 10).unwrap(), 0);
    }

    #[test]
    fn test_non_positive_quantity_rejected_first() {
        // Zero stock plus a zero exit is a validation failure, not a stock failure
        let err = toner(0).apply_movement(MovementKind::Exit, 0).unwrap_err();
        assert!(err.to_string().contains("must be greater than zero"));

        let err = toner(5).apply_movement(MovementKind::Entry, -2).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_entry_overflow_is_rejected() {
        let err = toner(i64::MAX).apply_movement(MovementKind::Entry, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_unknown_import_keys_become_extra_fields() {
        let product: Product = serde_json::from_value(json!({
            "code": "7591002200046",
            "name": "Toner HP 12A",
            "quantity": 10,
            "min_stock": 2,
            "expiration_date": "2030-01-31"
        }))
        .unwrap();

        assert_eq!(product.unit, "units");
        assert_eq!(product.extra_i64("min_stock"), Some(2));
        assert_eq!(product.extra_str("expiration_date"), Some("2030-01-31"));
        assert!(!product.extra_fields.contains_key("quantity"));
    }

    #[test]
    fn test_extra_i64_accepts_numeric_strings() {
        let mut product = toner(1);
        product
            .extra_fields
            .insert("max_stock".to_string(), json!(" 40 "));
        assert_eq!(product.extra_i64("max_stock"), Some(40));

        product
            .extra_fields
            .insert("max_stock".to_string(), json!(true));
        assert_eq!(product.extra_i64("max_stock"), None);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Entry".parse::<MovementKind>().unwrap(), MovementKind::Entry);
        assert_eq!("out".parse::<MovementKind>().unwrap(), MovementKind::Exit);
        assert!("sideways".parse::<MovementKind>().is_err());

        for kind in [
            OperationKind::Create,
            OperationKind::Update,
            OperationKind::Delete,
            OperationKind::Movement,
        ] {
            assert_eq!(kind.as_str().parse::<OperationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_movement_ids_are_unique() {
        let a = Movement::new("A1", MovementKind::Entry, 1, "ana", "");
        let b = Movement::new("A1", MovementKind::Entry, 1, "ana", "");
        assert_ne!(a.id, b.id);
    }
}
