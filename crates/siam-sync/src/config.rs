//! # Application Configuration
//!
//! Configuration for the remote catalog, the local cache, replay and alerts.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SIAM_PROJECT_ID=siam-inventory                                     │
//! │     SIAM_API_KEY=AIza...                                               │
//! │                                                                         │
//! │  2. Legacy firebase-config.json next to siam.toml                      │
//! │     Only fills project_id / api_key when the TOML leaves them blank    │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/inventory/siam.toml (Linux)                              │
//! │     ~/Library/Application Support/com.siam.inventory/siam.toml (macOS) │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! │     No credentials: the repository starts Offline                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # siam.toml
//! [remote]
//! project_id = "siam-inventory"
//! api_key = "AIza..."
//! database = "(default)"
//! endpoint = "https://firestore.googleapis.com/v1"
//! request_timeout_secs = 10
//! list_timeout_secs = 15
//! page_size = 300
//!
//! [cache]
//! database_path = "/var/lib/siam/siam.db"
//!
//! [sync]
//! max_attempts = 10
//! refresh_on_connect = true
//!
//! [alerts]
//! low_stock_ratio = 0.15
//! expiry_window_days = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use siam_core::alerts::AlertThresholds;

/// Values shipped in sample configs that mean "not configured yet".
pub const CREDENTIAL_PLACEHOLDERS: &[&str] =
    &["TU_PROJECT_ID", "TU_API_KEY", "YOUR_PROJECT_ID", "YOUR_API_KEY"];

/// File name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "siam.toml";

/// File name of the legacy credentials file.
pub const LEGACY_CONFIG_FILE_NAME: &str = "firebase-config.json";

/// Upper bound for the expiry look-ahead window (ten years).
pub const MAX_EXPIRY_WINDOW_DAYS: i64 = 3650;

fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || CREDENTIAL_PLACEHOLDERS.contains(&value)
}

// =============================================================================
// Remote Settings
// =============================================================================

/// Firestore REST connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub project_id: String,

    #[serde(default)]
    pub api_key: String,

    /// Firestore database id.
    #[serde(default = "default_database")]
    pub database: String,

    /// REST endpoint up to and excluding `/projects`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout for single-document calls (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for each page of a full listing (seconds).
    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,

    /// Documents requested per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_endpoint() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_list_timeout() -> u64 {
    15
}

fn default_page_size() -> u32 {
    300
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            project_id: String::new(),
            api_key: String::new(),
            database: default_database(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout(),
            list_timeout_secs: default_list_timeout(),
            page_size: default_page_size(),
        }
    }
}

impl RemoteSettings {
    /// Settings for `project_id` / `api_key` with every other value defaulted.
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        RemoteSettings {
            project_id: project_id.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// True when both credentials are present and neither is a placeholder.
    pub fn has_credentials(&self) -> bool {
        !is_placeholder(&self.project_id) && !is_placeholder(&self.api_key)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

// =============================================================================
// Cache, Sync and Alert Settings
// =============================================================================

/// Local cache settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// SQLite file. Defaults to `siam.db` in the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

/// Pending-queue replay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Failed attempts after which a pending operation is skipped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// Download the catalog right after a successful `connect()`.
    #[serde(default = "default_true")]
    pub refresh_on_connect: bool,
}

fn default_max_attempts() -> i64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            max_attempts: default_max_attempts(),
            refresh_on_connect: true,
        }
    }
}

/// Alert thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSettings {
    #[serde(default = "default_low_stock_ratio")]
    pub low_stock_ratio: f64,

    #[serde(default = "default_expiry_window")]
    pub expiry_window_days: i64,
}

fn default_low_stock_ratio() -> f64 {
    AlertThresholds::default().low_stock_ratio
}

fn default_expiry_window() -> i64 {
    AlertThresholds::default().expiry_window_days
}

impl Default for AlertSettings {
    fn default() -> Self {
        AlertSettings {
            low_stock_ratio: default_low_stock_ratio(),
            expiry_window_days: default_expiry_window(),
        }
    }
}

impl AlertSettings {
    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            low_stock_ratio: self.low_stock_ratio,
            expiry_window_days: self.expiry_window_days,
        }
    }
}

// =============================================================================
// Legacy Credentials
// =============================================================================

/// Shape of the legacy `firebase-config.json`.
#[derive(Debug, Deserialize)]
struct LegacyCredentials {
    #[serde(default, alias = "projectId")]
    project_id: String,
    #[serde(default, alias = "apiKey")]
    api_key: String,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub alerts: AlertSettings,
}

impl AppConfig {
    /// Loads configuration from file, legacy credentials, environment and
    /// defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (siam.toml)
    /// 3. firebase-config.json in the same directory (blank credentials only)
    /// 4. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }

            if let Some(dir) = path.parent() {
                let legacy = dir.join(LEGACY_CONFIG_FILE_NAME);
                if legacy.exists() {
                    config.merge_legacy_credentials(&legacy)?;
                }
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file as pretty TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Fills blank credentials from a legacy `firebase-config.json`.
    ///
    /// Returns true if anything was taken from the file.
    pub fn merge_legacy_credentials(&mut self, path: &Path) -> SyncResult<bool> {
        let contents = std::fs::read_to_string(path)?;
        let legacy: LegacyCredentials = serde_json::from_str(&contents)
            .map_err(|e| SyncError::ConfigLoadFailed(format!("{}: {}", path.display(), e)))?;

        let mut merged = false;
        if is_placeholder(&self.remote.project_id) && !is_placeholder(&legacy.project_id) {
            self.remote.project_id = legacy.project_id;
            merged = true;
        }
        if is_placeholder(&self.remote.api_key) && !is_placeholder(&legacy.api_key) {
            self.remote.api_key = legacy.api_key;
            merged = true;
        }

        if merged {
            info!(?path, "Merged credentials from legacy config");
        }
        Ok(merged)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let endpoint = url::Url::parse(&self.remote.endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "Endpoint must use http or https, got: {}",
                self.remote.endpoint
            )));
        }

        if self.remote.database.trim().is_empty() {
            return Err(SyncError::InvalidConfig("database must not be empty".into()));
        }

        if self.remote.request_timeout_secs == 0 || self.remote.list_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeouts must be greater than 0".into(),
            ));
        }

        if self.remote.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "page_size must be greater than 0".into(),
            ));
        }

        if self.sync.max_attempts < 1 {
            return Err(SyncError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.alerts.low_stock_ratio) {
            return Err(SyncError::InvalidConfig(
                "low_stock_ratio must be between 0 and 1".into(),
            ));
        }

        if !(0..=MAX_EXPIRY_WINDOW_DAYS).contains(&self.alerts.expiry_window_days) {
            return Err(SyncError::InvalidConfig(format!(
                "expiry_window_days must be between 0 and {}",
                MAX_EXPIRY_WINDOW_DAYS
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("SIAM_PROJECT_ID") {
            debug!(project_id = %id, "Overriding project id from environment");
            self.remote.project_id = id;
        }

        if let Ok(key) = std::env::var("SIAM_API_KEY") {
            debug!("Overriding API key from environment");
            self.remote.api_key = key;
        }

        if let Ok(endpoint) = std::env::var("SIAM_FIRESTORE_ENDPOINT") {
            debug!(endpoint = %endpoint, "Overriding endpoint from environment");
            self.remote.endpoint = endpoint;
        }

        if let Ok(path) = std::env::var("SIAM_DB_PATH") {
            self.cache.database_path = Some(PathBuf::from(path));
        }

        if let Ok(attempts) = std::env::var("SIAM_MAX_ATTEMPTS") {
            match attempts.parse::<i64>() {
                Ok(n) => self.sync.max_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring non-numeric SIAM_MAX_ATTEMPTS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "siam", "inventory")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Returns the SQLite path, resolving the platform default if unset.
    pub fn database_path(&self) -> PathBuf {
        self.cache.database_path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "siam", "inventory")
                .map(|dirs| dirs.data_dir().join("siam.db"))
                .unwrap_or_else(|| PathBuf::from("siam.db"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.remote.database, "(default)");
        assert_eq!(config.remote.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.remote.list_timeout(), Duration::from_secs(15));
        assert_eq!(config.sync.max_attempts, 10);
        assert!(config.sync.refresh_on_connect);
        assert!(!config.remote.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_placeholders_are_not_credentials() {
        assert!(!RemoteSettings::new("TU_PROJECT_ID", "TU_API_KEY").has_credentials());
        assert!(!RemoteSettings::new("YOUR_PROJECT_ID", "real-key").has_credentials());
        assert!(!RemoteSettings::new("siam", "  ").has_credentials());
        assert!(RemoteSettings::new("siam-inventory", "AIza123").has_credentials());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.remote.endpoint = "ftp://firestore".into();
        assert!(config.validate().is_err());

        config.remote.endpoint = "not a url".into();
        assert!(config.validate().unwrap_err().is_config_error());

        config.remote.endpoint = "http://127.0.0.1:8080".into();
        assert!(config.validate().is_ok());

        config.sync.max_attempts = 0;
        assert!(config.validate().is_err());
        config.sync.max_attempts = 3;

        config.alerts.expiry_window_days = MAX_EXPIRY_WINDOW_DAYS + 1;
        assert!(config.validate().is_err());
        config.alerts.expiry_window_days = 7;

        config.alerts.low_stock_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [remote]
            project_id = "siam-inventory"
            api_key = "AIza123"

            [sync]
            max_attempts = 4
            "#,
        )
        .unwrap();

        assert!(config.remote.has_credentials());
        assert_eq!(config.remote.page_size, 300);
        assert_eq!(config.sync.max_attempts, 4);
        assert!(config.sync.refresh_on_connect);
        assert_eq!(config.alerts.expiry_window_days, 30);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.remote = RemoteSettings::new("siam-inventory", "AIza123");
        config.cache.database_path = Some(dir.path().join("siam.db"));
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[remote]"));
        assert!(text.contains("[sync]"));

        let loaded: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_legacy_credentials_fill_blanks_only() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join(LEGACY_CONFIG_FILE_NAME);
        std::fs::write(&legacy, r#"{"projectId": "legacy-project", "api_key": "legacy-key"}"#)
            .unwrap();

        let mut config = AppConfig::default();
        config.remote.api_key = "toml-key".into();

        assert!(config.merge_legacy_credentials(&legacy).unwrap());
        assert_eq!(config.remote.project_id, "legacy-project");
        assert_eq!(config.remote.api_key, "toml-key");

        assert!(!config.merge_legacy_credentials(&legacy).unwrap());
    }

    #[test]
    fn test_malformed_legacy_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join(LEGACY_CONFIG_FILE_NAME);
        std::fs::write(&legacy, "{ not json").unwrap();

        let err = AppConfig::default()
            .merge_legacy_credentials(&legacy)
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let mut config = AppConfig::default();
        config.cache.database_path = Some(PathBuf::from("/tmp/siam-test.db"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/siam-test.db"));
    }
}
