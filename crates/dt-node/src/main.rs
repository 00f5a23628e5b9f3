//! # Data Transfer Node
//!
//! ```text
//! dt-node [CONFIG.toml]
//! ```
//!
//! Runs until Ctrl+C, then stops the manager. Channels still in flight are
//! persisted and resumed on the next start when the RocksDB backend is used.

use anyhow::{Context, Result};
use dt_node::{init_logging, NodeConfig, NodeRuntime, TelemetryConfig};
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::from_env()).context("failed to initialize logging")?;

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = NodeConfig::load(path.as_deref()).context("failed to load configuration")?;

    let mut runtime = NodeRuntime::build(config)
        .await
        .context("failed to build node")?;
    if let Err(e) = runtime.start().await {
        error!(error = %e, "Node failed to start cleanly");
        runtime.shutdown().await.context("failed to shut down")?;
        return Err(e).context("failed to start node");
    }

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await.context("failed to shut down")?;
    Ok(())
}
