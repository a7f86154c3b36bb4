//! Configuration for purchase-credits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Google Play publisher API base.
pub const DEFAULT_PUBLISHER_API_BASE: &str =
    "https://androidpublisher.googleapis.com/androidpublisher/v3";

/// OAuth scope required by the publisher API.
pub const ANDROID_PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";

/// App Store production receipt endpoint.
pub const APPLE_PRODUCTION_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";

/// App Store sandbox receipt endpoint.
pub const APPLE_SANDBOX_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Google Play verification settings.
    #[serde(default)]
    pub android: AndroidConfig,

    /// App Store verification settings.
    #[serde(default)]
    pub ios: IosConfig,

    /// Product id to credit amount.
    #[serde(default)]
    pub products: BTreeMap<String, u64>,
}

/// Google Play verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndroidConfig {
    /// Application package name.
    #[serde(default)]
    pub package_name: String,

    /// Path to the service-account key file.
    #[serde(default = "default_service_account_key")]
    pub service_account_key: PathBuf,

    /// Publisher API base URL.
    #[serde(default = "default_publisher_api_base")]
    pub publisher_api_base: String,

    /// OAuth scope requested for the publisher API.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// App Store verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IosConfig {
    /// App-specific shared secret.
    #[serde(default)]
    pub shared_secret: String,

    /// Production verifyReceipt URL.
    #[serde(default = "default_production_url")]
    pub production_url: String,

    /// Sandbox verifyReceipt URL.
    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,

    /// Ask Apple to return only the latest renewal transactions.
    #[serde(default = "default_true")]
    pub exclude_old_transactions: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            android: AndroidConfig::default(),
            ios: IosConfig::default(),
            products: BTreeMap::new(),
        }
    }
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self {
            package_name: String::new(),
            service_account_key: default_service_account_key(),
            publisher_api_base: default_publisher_api_base(),
            scope: default_scope(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for IosConfig {
    fn default() -> Self {
        Self {
            shared_secret: String::new(),
            production_url: default_production_url(),
            sandbox_url: default_sandbox_url(),
            exclude_old_transactions: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AndroidConfig {
    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl IosConfig {
    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_account_key() -> PathBuf {
    PathBuf::from("google_service_account_key.json")
}

fn default_publisher_api_base() -> String {
    DEFAULT_PUBLISHER_API_BASE.to_string()
}

fn default_scope() -> String {
    ANDROID_PUBLISHER_SCOPE.to_string()
}

fn default_production_url() -> String {
    APPLE_PRODUCTION_URL.to_string()
}

fn default_sandbox_url() -> String {
    APPLE_SANDBOX_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    5
}

const fn default_true() -> bool {
    true
}

/// Default location of the configuration file.
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "purchase-credits")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("purchase-credits.toml"))
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
