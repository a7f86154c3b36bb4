//! Command-line interface definition.

use clap::{Parser, Subcommand, ValueEnum};
use purchase_credits::config::default_config_path;
use purchase_credits::{Platform, ServiceConfig};
use std::path::PathBuf;

/// Verify in-app purchases and inspect the credit catalog.
#[derive(Parser, Debug)]
#[command(name = "purchase-credits")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level; defaults to `log_level` from the configuration file.
    #[arg(long, env = "RUST_LOG", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Path to configuration file.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Android application package name.
    #[arg(long, env = "PACKAGE_NAME", hide_env_values = true, global = true)]
    pub package_name: Option<String>,

    /// App Store shared secret.
    #[arg(long, env = "APPLE_SHARED_SECRET", hide_env_values = true, global = true)]
    pub apple_shared_secret: Option<String>,

    /// Path to the Google service-account key file.
    #[arg(long, env = "GOOGLE_SERVICE_ACCOUNT_KEY", global = true)]
    pub service_account_key: Option<PathBuf>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify one purchase with its store and print the verdict.
    Verify {
        /// Store the purchase was made on.
        #[arg(long, value_enum)]
        platform: CliPlatform,

        /// Store product identifier.
        #[arg(long)]
        product_id: String,

        /// Purchase token or App Store receipt.
        #[arg(long)]
        token: String,
    },

    /// Print the configured product catalog.
    Products,

    /// Write a default configuration file.
    InitConfig {
        /// Destination path.
        path: Option<PathBuf>,
    },
}

/// Platform CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliPlatform {
    /// Google Play.
    Android,
    /// Apple App Store.
    Ios,
}

impl Cli {
    /// Load the configuration file and apply command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn load_config(&self) -> color_eyre::Result<ServiceConfig> {
        // Start with default config or load from file
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    ServiceConfig::from_file(&path)?
                } else {
                    ServiceConfig::default()
                }
            }
        };

        // Override with CLI arguments
        if let Some(package_name) = &self.package_name {
            config.android.package_name.clone_from(package_name);
        }
        if let Some(secret) = &self.apple_shared_secret {
            config.ios.shared_secret.clone_from(secret);
        }
        if let Some(key) = &self.service_account_key {
            config.android.service_account_key.clone_from(key);
        }
        if let Some(log_level) = &self.log_level {
            config.log_level.clone_from(log_level);
        }

        Ok(config)
    }
}

impl From<CliPlatform> for Platform {
    fn from(p: CliPlatform) -> Self {
        match p {
            CliPlatform::Android => Self::Android,
            CliPlatform::Ios => Self::Ios,
        }
    }
}
