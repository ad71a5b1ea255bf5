//! # CLI Error Type
//!
//! Unified error type for every command.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the SIAM CLI                           │
//! │                                                                         │
//! │  siam exit 7591002200046 15                                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  CliResult<()>                                                   │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Config Error? ─── SyncError::InvalidConfig ──────┐             │  │
//! │  │         │                                         │             │  │
//! │  │         ▼                                         ▼             │  │
//! │  │  Stock rule? ──── CoreError::InsufficientStock ── CliError ────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stderr: "✗ Insufficient stock. Available: 10"                          │
//! │  --json: {"code":"INSUFFICIENT_STOCK","message":"..."}                  │
//! │  exit status: ErrorCode::exit_code()                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use siam_core::CoreError;
use siam_db::DbError;
use siam_sync::{Notice, SyncError};
use std::fmt;

/// Error returned from a command.
///
/// ## Serialization
/// With `--json`, this is what the caller receives on stderr:
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliError {
    /// Machine-readable error code for scripts
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product is neither cached nor in the remote catalog
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Exit larger than the stock on hand
    InsufficientStock,

    /// The local cache refused a write
    StorageError,

    /// Configuration could not be loaded or is invalid
    ConfigError,

    /// The remote catalog failed
    RemoteError,

    /// Input file could not be read or parsed
    InputError,

    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Process exit status for this code.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorCode::NotFound => 3,
            ErrorCode::ValidationError | ErrorCode::InsufficientStock => 4,
            ErrorCode::ConfigError => 78,
            ErrorCode::InputError => 66,
            ErrorCode::StorageError | ErrorCode::RemoteError | ErrorCode::Internal => 1,
        }
    }
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        CliError::new(ErrorCode::NotFound, format!("Product not found: {}", what))
    }

    pub fn input(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::InputError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::Internal, message)
    }
}

/// Stock and validation errors reuse the wording shown on screen.
impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::Storage(_) => ErrorCode::StorageError,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        CliError::new(code, Notice::from_error(&err).message)
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                CliError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::ConnectionFailed(e) | DbError::MigrationFailed(e) => {
                tracing::error!(error = %e, "Local cache unavailable");
                CliError::new(ErrorCode::StorageError, format!("Could not open the local cache: {}", e))
            }
            other => {
                tracing::error!(error = %other, "Local cache operation failed");
                CliError::new(ErrorCode::StorageError, other.to_string())
            }
        }
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        if err.is_config_error() {
            CliError::new(ErrorCode::ConfigError, err.to_string())
        } else {
            CliError::new(ErrorCode::RemoteError, err.to_string())
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::input(format!("Invalid JSON: {}", err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::input(err.to_string())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "✗ {}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Convenience type alias for command results.
pub type CliResult<T> = Result<T, CliError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use siam_core::ValidationError;

    #[test]
    fn test_core_errors_keep_screen_wording() {
        let err = CliError::from(CoreError::InsufficientStock {
            code: "A1".into(),
            available: 10,
            requested: 15,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.message, "Insufficient stock. Available: 10");

        let err = CliError::from(CoreError::Validation(ValidationError::MustBePositive {
            field: "quantity".into(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.to_string(), "✗ Quantity must be greater than zero");
    }

    #[test]
    fn test_sync_errors_split_config_from_remote() {
        assert_eq!(CliError::from(SyncError::NotConfigured).code, ErrorCode::ConfigError);
        assert_eq!(
            CliError::from(SyncError::Timeout("list".into())).code,
            ErrorCode::RemoteError
        );
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(CliError::not_found("A1")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Product not found: A1");
    }

    #[test]
    fn test_exit_codes_are_nonzero() {
        for code in [
            ErrorCode::NotFound,
            ErrorCode::ValidationError,
            ErrorCode::InsufficientStock,
            ErrorCode::StorageError,
            ErrorCode::ConfigError,
            ErrorCode::RemoteError,
            ErrorCode::InputError,
            ErrorCode::Internal,
        ] {
            assert_ne!(code.exit_code(), 0);
        }
    }
}
