//! In-process network
//!
//! Connects several consensus services running in one process. Each node
//! gets a [`LoopbackLink`] that implements both the peer-RPC and the
//! broadcast ports by calling the target node's [`ConsensusApi`] directly.
//! Validator lists go to the target's [`RegistryGateway`], if it has one.

use crate::domain::PeerError;
use crate::ports::{Broadcaster, ConsensusApi, OutboundMessage, PeerClient, RegistryGateway};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use shared_types::{Address, Block, Height, ProofVote};
use std::net::IpAddr;
use std::sync::Arc;

/// Hub holding every node reachable in-process.
#[derive(Default)]
pub struct LoopbackNetwork {
    nodes: DashMap<IpAddr, Arc<dyn ConsensusApi>>,
    registries: DashMap<IpAddr, Arc<dyn RegistryGateway>>,
    offline: DashSet<IpAddr>,
}

impl LoopbackNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, ip: IpAddr, node: Arc<dyn ConsensusApi>) {
        self.nodes.insert(ip, node);
    }

    pub fn register_registry(&self, ip: IpAddr, registry: Arc<dyn RegistryGateway>) {
        self.registries.insert(ip, registry);
    }

    /// Make `ip` unreachable (or reachable again).
    pub fn set_offline(&self, ip: IpAddr, offline: bool) {
        if offline {
            self.offline.insert(ip);
        } else {
            self.offline.remove(&ip);
        }
    }

    /// Endpoint for the node at `local`.
    pub fn link(self: &Arc<Self>, local: IpAddr) -> LoopbackLink {
        LoopbackLink {
            network: Arc::clone(self),
            local,
        }
    }

    fn node(&self, ip: IpAddr) -> Result<Arc<dyn ConsensusApi>, PeerError> {
        if self.offline.contains(&ip) {
            return Err(PeerError::Unavailable(format!("{} is offline", ip)));
        }
        self.nodes
            .get(&ip)
            .map(|n| Arc::clone(n.value()))
            .ok_or_else(|| PeerError::Unavailable(format!("no node at {}", ip)))
    }
}

/// One node's view of the loopback network.
pub struct LoopbackLink {
    network: Arc<LoopbackNetwork>,
    local: IpAddr,
}

impl LoopbackLink {
    pub fn local_ip(&self) -> IpAddr {
        self.local
    }

    fn check_self(&self) -> Result<(), PeerError> {
        if self.network.offline.contains(&self.local) {
            return Err(PeerError::Unavailable("local node offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PeerClient for LoopbackLink {
    async fn heartbeat(&self, peer: IpAddr) -> Result<(), PeerError> {
        self.check_self()?;
        self.network.node(peer).map(|_| ())
    }

    async fn get_block(&self, peer: IpAddr, height: Height) -> Result<Option<Block>, PeerError> {
        self.check_self()?;
        Ok(self.network.node(peer)?.block_at(height).await)
    }

    async fn send_approval(&self, peer: IpAddr, height: Height, approver: &Address) -> Result<(), PeerError> {
        self.check_self()?;
        self.network
            .node(peer)?
            .accept_approval(height, approver.clone(), self.local)
            .map(|_| ())
            .map_err(|e| PeerError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl Broadcaster for LoopbackLink {
    async fn deliver(&self, peer: IpAddr, message: &OutboundMessage) -> Result<(), PeerError> {
        self.check_self()?;
        let node = self.network.node(peer)?;
        // Refusals on the receiving side still count as delivered.
        let handled = match message {
            OutboundMessage::Vote(ProofVote::Proof(proof)) => {
                node.accept_proof(proof.clone(), self.local).await.map(|_| ())
            }
            OutboundMessage::Vote(ProofVote::Claim(claim)) => {
                node.accept_claim(claim.clone(), self.local).await.map(|_| ())
            }
            OutboundMessage::Block(block) => node.accept_block((**block).clone(), self.local).await,
            OutboundMessage::ValidatorList(list) => {
                let registry = self
                    .network
                    .registries
                    .get(&peer)
                    .map(|r| Arc::clone(r.value()));
                match registry {
                    Some(registry) => {
                        let rejected = registry.ingest_list(list.clone(), self.local).await;
                        if rejected > 0 {
                            tracing::trace!(peer_ip = %peer, rejected, "Peer rejected list entries");
                        }
                    }
                    None => tracing::trace!(peer_ip = %peer, "Peer has no registry"),
                }
                Ok(())
            }
        };
        if let Err(e) = handled {
            tracing::trace!(peer_ip = %peer, message = message.label(), error = %e, "Peer ignored message");
        }
        Ok(())
    }
}
