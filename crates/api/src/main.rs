//! Anomaly Criticality Server - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = AppConfig::load(config_path.as_deref()).context("loading configuration")?;

    init_logging(&config.logging);

    info!("=== Anomaly Criticality Server v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        model = %config.model.path,
        storage = %config.storage.database_url,
        "Starting criticality scoring service..."
    );

    run_server(config).await.context("running API server")?;

    Ok(())
}
