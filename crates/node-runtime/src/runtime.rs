//! # Node Runtime
//!
//! Owns the long-lived tasks and the shutdown channel.
//!
//! ## Tasks
//!
//! - Consensus loop (one height at a time, supervised)
//! - Registry cleanup loop
//! - Registry gossip loop
//! - Mempool eviction loop

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::SubsystemContainer;

/// How long shutdown waits for each task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct NodeRuntime {
    container: Arc<SubsystemContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl NodeRuntime {
    pub fn new(container: SubsystemContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container: Arc::new(container),
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        }
    }

    pub fn container(&self) -> Arc<SubsystemContainer> {
        Arc::clone(&self.container)
    }

    /// Spawn every loop. Call once.
    pub fn start(&mut self) {
        let config = &self.container.config;
        info!("===========================================");
        info!("  CastChain Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!(address = %self.container.address, ip = %config.node.public_ip, "Node identity");
        info!(p2p_port = config.network.p2p_port, rpc_port = config.network.rpc_port, "Network ports");

        let registry = Arc::clone(&self.container.registry);
        let cleanup_interval = Duration::from_secs(config.registry.cleanup_interval_secs);
        self.tasks.push((
            "registry-cleanup",
            tokio::spawn(registry.run_cleanup_loop(cleanup_interval, self.shutdown_rx.clone())),
        ));

        let registry = Arc::clone(&self.container.registry);
        let gossip = Arc::clone(&self.container.gossip);
        let gossip_interval = Duration::from_secs(config.registry.gossip_interval_secs);
        self.tasks.push((
            "registry-gossip",
            tokio::spawn(registry.run_gossip_loop(
                gossip,
                self.container.address.clone(),
                gossip_interval,
                self.shutdown_rx.clone(),
            )),
        ));

        let mempool = Arc::clone(&self.container.mempool);
        let eviction_interval = Duration::from_secs(config.mempool.eviction_interval_secs);
        self.tasks.push((
            "mempool-eviction",
            tokio::spawn(mempool.run_eviction_loop(eviction_interval, self.shutdown_rx.clone())),
        ));

        let consensus = Arc::clone(&self.container.consensus);
        self.tasks.push((
            "consensus",
            tokio::spawn(consensus.run(self.shutdown_rx.clone())),
        ));

        info!(tasks = self.tasks.len(), "Node started");
    }

    /// Signal shutdown and wait for every task.
    pub async fn shutdown(mut self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        for (name, handle) in self.tasks.drain(..) {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => info!(task = name, "Task stopped"),
                Ok(Err(e)) => error!(task = name, error = %e, "Task ended abnormally"),
                Err(_) => warn!(task = name, "Task did not stop in time"),
            }
        }
        info!("Shutdown complete");
    }
}
