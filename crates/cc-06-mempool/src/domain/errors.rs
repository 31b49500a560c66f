//! Mempool error types.
//!
//! Defines all error conditions for the Mempool subsystem.

use super::entities::{Address, TxHash};
use shared_types::{ErrorKind, Timestamp};

/// Mempool error type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MempoolError {
    /// Hash was rejected recently; dropped without re-validation.
    PreviouslyRejected(TxHash),

    /// Sender is on the address block-list.
    BlockedAddress(Address),

    /// Timestamp older than the accepted age.
    TooOld { timestamp: Timestamp, now: Timestamp },

    /// Timestamp too far in the future.
    TooFarInFuture { timestamp: Timestamp, now: Timestamp },

    /// Transaction already exists in the pool.
    DuplicateTransaction(TxHash),

    /// Transaction is already in a block.
    AlreadyMined(TxHash),

    /// Stored hash does not match the content.
    HashMismatch(TxHash),

    /// Signature or key does not match the sender.
    InvalidSignature(TxHash),

    /// Another pooled transaction already uses this sender nonce.
    DoubleSpend { address: Address, nonce: u64 },

    /// Nonce already consumed on chain.
    Replay { address: Address, nonce: u64 },

    /// Transfer fee below the size-based floor.
    FeeTooLow { fee: u64, required: u64 },

    /// Sender has reached its pending quota.
    SenderQuotaFull { address: Address, limit: usize },

    /// Rated F for any other reason.
    RatingTooLow(TxHash),

    /// Pool has reached maximum entry count.
    PoolFull { capacity: usize },

    /// Admitting would exceed the byte budget.
    PoolSizeExceeded { size: usize, limit: usize },

    /// Transaction not found in the pool.
    TransactionNotFound(TxHash),

    /// Chain lookup failed.
    ChainLookup(String),
}

impl MempoolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::HashMismatch(_) => ErrorKind::Malformed,
            Self::InvalidSignature(_) | Self::BlockedAddress(_) => ErrorKind::Authentication,
            Self::PreviouslyRejected(_)
            | Self::TooOld { .. }
            | Self::TooFarInFuture { .. }
            | Self::DuplicateTransaction(_)
            | Self::AlreadyMined(_)
            | Self::DoubleSpend { .. }
            | Self::Replay { .. } => ErrorKind::StaleOrDuplicate,
            Self::FeeTooLow { .. }
            | Self::SenderQuotaFull { .. }
            | Self::RatingTooLow(_)
            | Self::PoolFull { .. }
            | Self::PoolSizeExceeded { .. }
            | Self::TransactionNotFound(_) => ErrorKind::ProtocolDisagreement,
            Self::ChainLookup(_) => ErrorKind::Internal,
        }
    }

    /// True for failures that can never become valid, worth remembering in
    /// the rejection cache.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::HashMismatch(_) | Self::InvalidSignature(_) | Self::TooOld { .. } | Self::Replay { .. }
        )
    }
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

impl std::fmt::Display for MempoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreviouslyRejected(hash) => {
                write!(f, "Transaction {} was recently rejected", short(hash))
            }
            Self::BlockedAddress(address) => write!(f, "Address {} is blocked", address),
            Self::TooOld { timestamp, now } => {
                write!(f, "Timestamp {} is too old (now: {})", timestamp, now)
            }
            Self::TooFarInFuture { timestamp, now } => {
                write!(
                    f,
                    "Timestamp {} is too far in the future (now: {})",
                    timestamp, now
                )
            }
            Self::DuplicateTransaction(hash) => {
                write!(f, "Duplicate transaction: {}", short(hash))
            }
            Self::AlreadyMined(hash) => write!(f, "Transaction {} already mined", short(hash)),
            Self::HashMismatch(hash) => {
                write!(f, "Transaction hash {} does not match content", short(hash))
            }
            Self::InvalidSignature(hash) => {
                write!(f, "Invalid signature on transaction {}", short(hash))
            }
            Self::DoubleSpend { address, nonce } => {
                write!(f, "Nonce {} of {} already pending", nonce, address)
            }
            Self::Replay { address, nonce } => {
                write!(f, "Nonce {} of {} already used on chain", nonce, address)
            }
            Self::FeeTooLow { fee, required } => {
                write!(f, "Fee {} below required {}", fee, required)
            }
            Self::SenderQuotaFull { address, limit } => {
                write!(
                    f,
                    "Account {} reached limit of {} transactions",
                    address, limit
                )
            }
            Self::RatingTooLow(hash) => write!(f, "Transaction {} rated F", short(hash)),
            Self::PoolFull { capacity } => {
                write!(f, "Pool full at {} transactions", capacity)
            }
            Self::PoolSizeExceeded { size, limit } => {
                write!(f, "Pool size {} bytes would exceed {}", size, limit)
            }
            Self::TransactionNotFound(hash) => {
                write!(f, "Transaction not found: {}", short(hash))
            }
            Self::ChainLookup(msg) => write!(f, "Chain lookup failed: {}", msg),
        }
    }
}

impl std::error::Error for MempoolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MempoolError::FeeTooLow {
            fee: 5,
            required: 20,
        };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains("20"));
    }

    #[test]
    fn test_duplicate_transaction_error_shortens_hash() {
        let err = MempoolError::DuplicateTransaction("abcdef0123456789".into());
        assert_eq!(err.to_string(), "Duplicate transaction: abcdef01");
    }

    #[test]
    fn test_permanent_failures() {
        assert!(MempoolError::InvalidSignature("h".into()).is_permanent());
        assert!(!MempoolError::PoolFull { capacity: 1 }.is_permanent());
        assert!(!MempoolError::TooFarInFuture { timestamp: 1, now: 0 }.is_permanent());
    }
}
