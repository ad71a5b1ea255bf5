//! # Error Types
//!
//! Domain-specific error types for siam-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  siam-core errors (this file)                                          │
//! │  ├── CoreError        - Stock rule violations, not found               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  siam-db errors (separate crate)                                       │
//! │  └── DbError          - Absorbed at the LocalCache boundary            │
//! │                                                                         │
//! │  siam-sync errors (separate crate)                                     │
//! │  └── SyncError        - Config, transport and wire failures            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → Notice → UI                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, quantities)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These are the failures a stock adjustment or product registration can
/// surface to the caller. Storage and transport faults never show up here
/// except for [`CoreError::Storage`], which covers the one case where the
/// local write itself was refused.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product is in neither the local cache nor the remote catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Exit would drive stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Exit (qty: 15)
    ///      │
    ///      ▼
    /// Check stock: available=10
    ///      │
    ///      ▼
    /// InsufficientStock { code: "7591002200046", available: 10, requested: 15 }
    ///      │
    ///      ▼
    /// UI shows: "Insufficient stock. Available: 10"
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// The local cache refused the write.
    #[error("Local storage error: {0}")]
    Storage(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Validation always runs before any state is mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Value may be zero but never negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., a code containing a path separator).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
