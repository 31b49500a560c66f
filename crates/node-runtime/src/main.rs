//! # CastChain Node Runtime
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `CC_CONFIG` file, environment)
//! 2. Initialize telemetry (metrics registry, log subscriber)
//! 3. Validate configuration; any bad value stops the node here
//! 4. Wire subsystems
//! 5. Spawn the consensus, registry cleanup and mempool eviction loops
//! 6. Run until Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use tracing::info;

use node_runtime::{NodeConfig, NodeRuntime, SubsystemContainer};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::load().context("Failed to load configuration")?;

    cc_telemetry::init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    config.validate().context("Invalid configuration")?;

    let container = SubsystemContainer::new(config).context("Failed to wire subsystems")?;
    let mut runtime = NodeRuntime::new(container);
    runtime.start();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
