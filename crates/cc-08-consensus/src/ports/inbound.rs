//! Driving ports (Inbound API)

use crate::domain::ConsensusError;
use async_trait::async_trait;
use shared_types::{Address, Block, Height, Proof, WinnerClaim};
use std::net::IpAddr;

/// Primary Consensus API
///
/// Everything a peer can hand the consensus engine outside of the round's
/// own outbound calls.
#[async_trait]
pub trait ConsensusApi: Send + Sync {
    /// A proof gossiped for the current height by the caster at `source`.
    async fn accept_proof(&self, proof: Proof, source: IpAddr) -> Result<bool, ConsensusError>;

    /// A peer's locally selected winner, sent by the voter at `source`.
    async fn accept_claim(&self, claim: WinnerClaim, source: IpAddr) -> Result<bool, ConsensusError>;

    /// An approval sent to us as leader.
    fn accept_approval(&self, height: Height, approver: Address, source: IpAddr) -> Result<bool, ConsensusError>;

    /// A confirmed block pushed by a peer.
    async fn accept_block(&self, block: Block, source: IpAddr) -> Result<(), ConsensusError>;

    /// Serve a block to a polling follower.
    async fn block_at(&self, height: Height) -> Option<Block>;

    /// Height of the round in progress.
    fn current_height(&self) -> Option<Height>;

    fn excluded_producers(&self) -> Vec<Address>;
}
