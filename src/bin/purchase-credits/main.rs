//! purchase-credits CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use purchase_credits::config::default_config_path;
use purchase_credits::{Platform, ProductCatalog, PurchaseVerifier, ServiceConfig, StoreVerifier};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration before tracing so its log level applies
    let config = match cli.command {
        Command::InitConfig { .. } => None,
        _ => Some(cli.load_config()?),
    };
    let log_level = config.as_ref().map_or_else(
        || cli.log_level.clone().unwrap_or_else(|| "info".to_string()),
        |config| config.log_level.clone(),
    );

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    info!("purchase-credits v{}", env!("CARGO_PKG_VERSION"));

    match (cli.command, config) {
        (
            Command::Verify {
                platform,
                product_id,
                token,
            },
            Some(config),
        ) => verify(&config, platform.into(), &product_id, &token).await,
        (Command::Products, Some(config)) => products(&config),
        (Command::InitConfig { path }, _) => init_config(path),
        (_, None) => Err(color_eyre::eyre::eyre!("configuration was not loaded")),
    }
}

async fn verify(
    config: &ServiceConfig,
    platform: Platform,
    product_id: &str,
    token: &str,
) -> color_eyre::Result<()> {
    let verifier = StoreVerifier::from_config(config)?;
    let verdict = verifier.verify(platform, token, product_id).await?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

fn products(config: &ServiceConfig) -> color_eyre::Result<()> {
    let catalog = ProductCatalog::from_config(&config.products)?;
    if catalog.is_empty() {
        info!("No products configured");
    }
    for (product_id, credits) in catalog.iter() {
        println!("{product_id}\t{credits}");
    }
    Ok(())
}

fn init_config(path: Option<PathBuf>) -> color_eyre::Result<()> {
    let path = path.unwrap_or_else(default_config_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut config = ServiceConfig::default();
    config.products.insert("credits_100".to_string(), 100);
    config.to_file(&path)?;

    info!("Wrote default configuration to {}", path.display());
    Ok(())
}
