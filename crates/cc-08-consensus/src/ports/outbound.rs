//! Driven ports (Outbound dependencies)

use crate::domain::PeerError;
use async_trait::async_trait;
use shared_types::{
    Address, Block, Height, IpReport, MessageCode, ProofVote, Transaction, ValidatorAdvertisement,
};
use std::net::IpAddr;

/// Direct peer RPCs the round issues. Callers wrap every call in a timeout.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn heartbeat(&self, peer: IpAddr) -> Result<(), PeerError>;

    /// `Ok(None)` if the peer has no block at that height yet.
    async fn get_block(&self, peer: IpAddr, height: Height) -> Result<Option<Block>, PeerError>;

    /// Tell the leader at `peer` that `approver` backs it for `height`.
    async fn send_approval(&self, peer: IpAddr, height: Height, approver: &Address) -> Result<(), PeerError>;
}

/// A message pushed to peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Vote(ProofVote),
    Block(Box<Block>),
    ValidatorList(Vec<ValidatorAdvertisement>),
}

impl OutboundMessage {
    pub fn code(&self) -> MessageCode {
        match self {
            Self::Vote(_) => MessageCode::ProofVote,
            Self::Block(_) => MessageCode::ConfirmedBlock,
            Self::ValidatorList(_) => MessageCode::ValidatorList,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vote(ProofVote::Proof(_)) => "proof",
            Self::Vote(ProofVote::Claim(_)) => "claim",
            Self::Block(_) => "block",
            Self::ValidatorList(_) => "validator_list",
        }
    }
}

/// Delivers one message to one peer.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn deliver(&self, peer: IpAddr, message: &OutboundMessage) -> Result<(), PeerError>;
}

/// The local chain.
#[async_trait]
pub trait ChainView: Send + Sync {
    /// `None` before genesis.
    async fn last_block(&self) -> Option<Block>;

    async fn block_at(&self, height: Height) -> Option<Block>;

    /// Append a block that extends the current tip.
    async fn adopt_block(&self, block: Block) -> Result<(), String>;

    /// Swap the tip for a competitor at the same height with the same
    /// parent. Returns the displaced block.
    async fn replace_tip(&self, block: Block) -> Result<Block, String>;

    async fn stake_of(&self, address: &Address) -> u64;
}

/// Who is casting and where they are.
pub trait ValidatorDirectory: Send + Sync {
    /// Addresses eligible to cast, not including the local node.
    fn casting_set(&self) -> Vec<Address>;

    fn ip_of(&self, address: &Address) -> Option<IpAddr>;

    /// Registered public key; proofs must be derived from it.
    fn public_key_of(&self, address: &Address) -> Option<String>;

    /// Peers to broadcast to.
    fn peer_ips(&self) -> Vec<IpAddr>;

    /// Outcome of a direct exchange with a validator (heartbeat, approval,
    /// delivered block or missed block).
    fn record_liveness(&self, address: &Address, reachable: bool);

    /// Competing blocks were seen for one height.
    fn note_fork(&self);
}

/// Mempool interface for block building
#[async_trait]
pub trait MempoolGateway: Send + Sync {
    async fn submit(&self, tx: Transaction) -> Result<(), String>;

    async fn select_for_block(&self, max_count: usize, max_bytes: usize) -> Vec<Transaction>;

    /// Check a received block's transactions before it is adopted.
    async fn validate_block_transactions(&self, block: &Block) -> Result<(), String>;

    /// Drop transactions the adopted block included or made stale.
    async fn remove_included(&self, transactions: &[Transaction]);
}

/// Registry side of inbound traffic.
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Banned sources are dropped before their payload is parsed.
    fn is_banned(&self, source: IpAddr) -> bool;

    /// Returns how many advertisements were rejected.
    async fn ingest_list(&self, list: Vec<ValidatorAdvertisement>, source: IpAddr) -> usize;

    fn ip_report(&self, report: &IpReport, source: IpAddr) -> Result<(), String>;
}
