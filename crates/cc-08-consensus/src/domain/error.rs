//! Error types for the consensus subsystem

use super::round::RoundPhase;
use shared_types::{Address, ErrorKind, Height, PayloadError};

/// Per-peer call failures. Never fatal; the round treats the peer as
/// unavailable and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerError {
    #[error("Peer call timed out")]
    Timeout,

    #[error("Peer unavailable: {0}")]
    Unavailable(String),

    #[error("Peer rejected request: {0}")]
    Rejected(String),
}

/// Consensus error types
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("Wrong height: expected {expected}, got {actual}")]
    WrongHeight { expected: Height, actual: Height },

    #[error("Proof or block for height {height} does not build on the current tip")]
    WrongParent { height: Height },

    #[error("Proof from {0} failed verification")]
    InvalidProof(Address),

    #[error("Malformed block: {0}")]
    MalformedBlock(String),

    #[error("Illegal round transition: {from:?} -> {to:?}")]
    IllegalTransition { from: RoundPhase, to: RoundPhase },

    #[error("Approval from unknown caster: {0}")]
    UnknownApprover(Address),

    #[error("{0} is not in the casting set")]
    UnknownCaster(Address),

    #[error("Public key does not match the key registered for {0}")]
    KeyMismatch(Address),

    #[error("Message for {address} arrived from unregistered source {peer_ip}")]
    SourceMismatch { address: Address, peer_ip: std::net::IpAddr },

    #[error("Block at height {height} from {validator} is not from a contending producer")]
    WrongProducer { height: Height, validator: Address },

    #[error("Stake {stake} of {address} is below the casting minimum")]
    InsufficientStake { address: Address, stake: u64 },

    #[error("Block contents rejected: {0}")]
    InvalidBlockContents(String),

    #[error("No round in progress")]
    NoActiveRound,

    #[error("Source {0} is banned")]
    SourceBanned(std::net::IpAddr),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Mempool error: {0}")]
    Mempool(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Invalid consensus configuration: {0}")]
    InvalidConfig(String),
}

impl ConsensusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Payload(e) => e.kind(),
            Self::MalformedBlock(_) => ErrorKind::Malformed,
            Self::InvalidProof(_)
            | Self::UnknownApprover(_)
            | Self::SourceBanned(_)
            | Self::UnknownCaster(_)
            | Self::KeyMismatch(_)
            | Self::SourceMismatch { .. }
            | Self::WrongProducer { .. } => ErrorKind::Authentication,
            Self::WrongHeight { .. } | Self::NoActiveRound => ErrorKind::StaleOrDuplicate,
            Self::WrongParent { .. }
            | Self::InsufficientStake { .. }
            | Self::InvalidBlockContents(_)
            | Self::Peer(_)
            | Self::Mempool(_)
            | Self::Registry(_) => ErrorKind::ProtocolDisagreement,
            Self::IllegalTransition { .. } | Self::Chain(_) | Self::InvalidConfig(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;
