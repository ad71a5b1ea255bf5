//! # UI Notices
//!
//! Turns repository results into the short messages shown to the operator.
//!
//! ```text
//! Ok(StockChange { kind: Entry, new_quantity: 8, .. })  → ✓ "Entry registered. New stock: 8"
//! Err(InsufficientStock { available: 10, .. })          → ✗ "Insufficient stock. Available: 10"
//! Err(ProductNotFound(..))                              → ✗ "Product not found"
//! Err(Validation(MustBePositive { field: quantity }))   → ✗ "Quantity must be greater than zero"
//! ```

use serde::Serialize;
use std::fmt;

use siam_core::{CoreError, CoreResult, RemoteWrite, StockChange};

/// A message for the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub success: bool,
    pub message: String,
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Notice {
            success: false,
            message: message.into(),
        }
    }

    /// Notice for a failed repository call.
    pub fn from_error(error: &CoreError) -> Self {
        match error {
            CoreError::ProductNotFound(_) => Notice::failure("Product not found"),
            CoreError::InsufficientStock { available, .. } => {
                Notice::failure(format!("Insufficient stock. Available: {}", available))
            }
            CoreError::Validation(e) => Notice::failure(capitalize(&e.to_string())),
            CoreError::Storage(e) => Notice::failure(format!("Could not save locally: {}", e)),
        }
    }

    /// Notice for an entry or exit.
    pub fn from_stock_result(result: &CoreResult<StockChange>) -> Self {
        match result {
            Ok(change) => {
                let mut message = format!(
                    "{} registered. New stock: {}",
                    change.kind.label(),
                    change.new_quantity
                );
                match change.remote {
                    RemoteWrite::Synced => {}
                    RemoteWrite::Queued => message.push_str(" (pending sync)"),
                    RemoteWrite::LocalOnly => message.push_str(" (saved on this device only)"),
                }
                Notice::success(message)
            }
            Err(e) => Notice::from_error(e),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.success { "✓" } else { "✗" };
        write!(f, "{} {}", mark, self.message)
    }
}
