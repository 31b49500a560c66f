//! # Subsystem Wiring
//!
//! Builds every service once and hands each one its collaborators through
//! the adapters in [`crate::adapters`].

use std::sync::Arc;

use cc_01_validator_registry::{
    AuthFailureTracker, AuthenticationGate, PermissiveAccountLookup, RegistryService,
    Secp256k1Signer, Secp256k1Verifier, ValidatorRegistry,
};
use cc_06_mempool::MempoolService;
use cc_08_consensus::{
    ConsensusDependencies, ConsensusService, InMemoryChain, InboundHandler, LoopbackNetwork,
};
use shared_types::{
    Address, AddressBlockList, InMemoryBlockList, SignatureVerifier, Signer, SystemTimeSource,
    TimeSource,
};
use tracing::{info, warn};

use super::config::{ConfigError, NodeConfig};
use crate::adapters::{ChainBridge, GossipBridge, MempoolBridge, RegistryBridge};

/// Container for all subsystem instances.
pub struct SubsystemContainer {
    pub config: NodeConfig,
    pub address: Address,
    pub chain: Arc<InMemoryChain>,
    pub block_list: Arc<InMemoryBlockList>,
    pub registry: Arc<RegistryService>,
    pub mempool: Arc<MempoolService>,
    pub consensus: Arc<ConsensusService>,
    /// Entry point for peer messages.
    pub inbound: InboundHandler<ConsensusService>,
    /// Transport for the registry's gossip loop.
    pub gossip: Arc<GossipBridge>,
    /// In-process peer network shared by every attached node.
    pub network: Arc<LoopbackNetwork>,
}

impl SubsystemContainer {
    /// Build with the system clock.
    pub fn new(config: NodeConfig) -> Result<Self, ConfigError> {
        Self::with_time_source(config, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(config: NodeConfig, time_source: Arc<dyn TimeSource>) -> Result<Self, ConfigError> {
        Self::attach(config, time_source, LoopbackNetwork::new())
    }

    /// Build and register on an existing in-process network, so several
    /// nodes can share one devnet.
    pub fn attach(
        config: NodeConfig,
        time_source: Arc<dyn TimeSource>,
        network: Arc<LoopbackNetwork>,
    ) -> Result<Self, ConfigError> {
        let signer = match &config.node.secret_key {
            Some(secret) => Secp256k1Signer::from_secret_hex(secret)
                .ok_or_else(|| ConfigError::Invalid("node.secret_key is not a valid secp256k1 secret".into()))?,
            None => {
                warn!("No secret key configured, generating an ephemeral identity");
                Secp256k1Signer::random()
            }
        };
        let signer: Arc<dyn Signer> = Arc::new(signer);
        let address = signer.address();
        let local_ip = config.node.public_ip;

        let verifier: Arc<dyn SignatureVerifier> = Arc::new(Secp256k1Verifier::new());
        let block_list = Arc::new(InMemoryBlockList::new());
        let abl: Arc<dyn AddressBlockList> = block_list.clone();
        let chain = Arc::new(InMemoryChain::new());

        // Validator registry
        let gate = AuthenticationGate::new(
            verifier.clone(),
            abl.clone(),
            Arc::new(PermissiveAccountLookup),
            Arc::new(AuthFailureTracker::new(config.auth.clone())),
            config.field_limits,
            config.registry.max_advertisement_skew_secs,
        );
        let registry = Arc::new(RegistryService::new(
            Arc::new(ValidatorRegistry::new(config.registry.clone())),
            gate,
            time_source.clone(),
        ));

        // Mempool
        let mempool = Arc::new(MempoolService::new(
            config.mempool.clone(),
            verifier,
            abl,
            Arc::new(ChainBridge::new(chain.clone())),
            time_source.clone(),
        ));

        // Consensus
        let link = Arc::new(network.link(local_ip));
        let registry_bridge = Arc::new(RegistryBridge::new(registry.clone(), address.clone()));
        let mempool_bridge = Arc::new(MempoolBridge::new(mempool.clone()));
        let gossip = Arc::new(GossipBridge::new(link.clone()));
        let consensus = Arc::new(ConsensusService::new(ConsensusDependencies {
            config: config.consensus.clone(),
            signer,
            local_ip,
            peers: link.clone(),
            broadcaster: link,
            chain: chain.clone(),
            directory: registry_bridge.clone(),
            mempool: mempool_bridge.clone(),
            time_source,
        }));
        network.register(local_ip, consensus.clone());
        network.register_registry(local_ip, registry_bridge.clone());

        let inbound = InboundHandler::new(
            consensus.clone(),
            registry_bridge,
            mempool_bridge,
            config.limits.clone(),
        );

        info!(address = %address, ip = %local_ip, "Subsystems wired");
        Ok(Self {
            config,
            address,
            chain,
            block_list,
            registry,
            mempool,
            consensus,
            inbound,
            gossip,
            network,
        })
    }
}
