use anyhow::{Context, Result};
use clap::Parser;
use indexer_node::{init_tracing, Args, IndexerNode, NodeConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config =
        NodeConfig::load(args.config.as_deref()).context("failed to load configuration")?;

    init_tracing(&config.telemetry).context("failed to initialise logging")?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "Starting indexer node"
    );

    let node = IndexerNode::build(config)?;
    let listener = node.bind().await?;

    node.run(listener, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    })
    .await?;

    info!("Shutdown complete");
    Ok(())
}
