//! Parley server binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the SQLite database
//! 3. Pick the deal system (HubSpot, or the in-memory mock)
//! 4. Start the axum REST API server

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use parley_api::{start_server, AppState};
use parley_core::ParleyConfig;
use parley_flow::{DealClient, HubSpotClient, MockDealClient};
use parley_storage::Database;

use crate::cli::CliArgs;

/// Expand ~ to the home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ParleyConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    config.general.port = args.resolve_port(config.general.port);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let db_path = resolve_data_dir(&config.general.data_dir).join("parley.db");
    let db = Database::new(&db_path)?;

    // Deal system.
    let crm: Arc<dyn DealClient> = if args.mock_crm || config.crm.api_token.is_none() {
        if !args.mock_crm {
            tracing::warn!("No CRM token configured, using the in-memory deal system");
        }
        Arc::new(MockDealClient::new())
    } else {
        tracing::info!(base_url = %config.crm.base_url, "Using HubSpot deal system");
        Arc::new(HubSpotClient::new(&config.crm)?)
    };

    start_server(AppState::new(config, db, crm)).await?;
    Ok(())
}
