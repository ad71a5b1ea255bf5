//! # Sync Error Types
//!
//! Error types for remote catalog and synchronization operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  InvalidDocument        │ │
//! │  │  NotConfigured  │  │  Timeout        │  │  SerializationFailed    │ │
//! │  │  InvalidUrl     │  │  HttpStatus     │  │  DeserializationFailed  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Database     │  │     Replay      │                              │
//! │  │                 │  │                 │                              │
//! │  │  DatabaseError  │  │  InvalidPayload │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering remote and configuration failures.
///
/// The orchestrator never hands these to the UI: reads degrade to
/// absent/empty and writes turn into pending operations.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Credentials are missing or still hold placeholder values.
    #[error("Remote catalog is not configured")]
    NotConfigured,

    /// Endpoint or document URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the remote store.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The request exceeded its timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The remote store answered with a non-success status.
    #[error("Remote returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// A document could not be mapped to a domain value.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Failed to serialize a request body or payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Failed to deserialize a response body.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Local database failure surfaced through a typed repository.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Replay Errors
    // =========================================================================
    /// A queued payload does not match its operation kind.
    #[error("Pending operation {id} has an invalid payload: {reason}")]
    InvalidPayload { id: i64, reason: String },
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<siam_db::DbError> for SyncError {
    fn from(err: siam_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            SyncError::DeserializationFailed(err.to_string())
        } else {
            SyncError::SerializationFailed(err.to_string())
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(err.to_string())
        } else if err.is_decode() {
            SyncError::DeserializationFailed(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::HttpStatus {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_builder() {
            SyncError::InvalidConfig(err.to_string())
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for replay and logging)
// =============================================================================

impl SyncError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the remote reported that the document does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true if the remote reported that the document already exists.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Returns true if trying again later may succeed.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - HTTP 408, 429 and any 5xx
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Malformed documents and payloads
    /// - Other 4xx answers
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) => true,
            SyncError::HttpStatus { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::NotConfigured
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::ConnectionFailed("network error".into()).is_retryable());
        assert!(SyncError::Timeout("10s".into()).is_retryable());
        assert!(SyncError::HttpStatus { status: 503, message: "unavailable".into() }.is_retryable());
        assert!(SyncError::HttpStatus { status: 429, message: "quota".into() }.is_retryable());

        assert!(!SyncError::HttpStatus { status: 400, message: "bad".into() }.is_retryable());
        assert!(!SyncError::NotConfigured.is_retryable());
        assert!(!SyncError::InvalidDocument("no name".into()).is_retryable());
    }

    #[test]
    fn test_status_helpers() {
        let missing = SyncError::HttpStatus { status: 404, message: "NOT_FOUND".into() };
        assert!(missing.is_not_found());
        assert!(!missing.is_conflict());

        let exists = SyncError::HttpStatus { status: 409, message: "ALREADY_EXISTS".into() };
        assert!(exists.is_conflict());
        assert_eq!(SyncError::Timeout("x".into()).status(), None);
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::NotConfigured.is_config_error());
        assert!(SyncError::InvalidUrl("nope".into()).is_config_error());
        assert!(!SyncError::ConnectionFailed("down".into()).is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::InvalidPayload { id: 7, reason: "missing code".into() };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains("missing code"));
    }
}
