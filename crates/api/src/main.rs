//! Malaria Cell Classifier - Main Entry Point

use api::{init_logging, run_server, ServiceConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::load()?;
    init_logging(&config.logging)?;

    info!("=== Malaria Cell Classifier v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Model artifact: {}", config.model.artifact_path.display());

    run_server(config).await
}
