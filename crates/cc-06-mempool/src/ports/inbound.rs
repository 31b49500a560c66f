//! # Inbound Port - MempoolApi
//!
//! Primary driving port exposing the transaction pool.

use async_trait::async_trait;
use shared_types::{Height, Transaction};

use crate::domain::{MempoolError, MempoolStatus, TxHash};

/// Primary API for the Mempool subsystem.
#[async_trait]
pub trait MempoolApi: Send + Sync {
    /// Run the full admission pipeline.
    async fn submit(&self, tx: Transaction) -> Result<TxHash, MempoolError>;

    /// Best transactions for the next block.
    fn select_for_block(&self, max_count: usize, max_bytes: usize) -> Vec<Transaction>;

    /// Check the transactions of a peer's block at `height` against the
    /// rules that still bind once a transaction is mined.
    async fn validate_block(&self, height: Height, transactions: &[Transaction]) -> Result<(), MempoolError>;

    /// Drop transactions included in an adopted block, and pooled
    /// transactions whose nonce the block consumed.
    fn remove_included(&self, transactions: &[Transaction]) -> usize;

    /// Evict down to the given targets; returns evicted hashes.
    fn evict_lowest_priority(&self, target_count: Option<usize>, target_size: Option<usize>) -> Vec<TxHash>;

    fn status(&self) -> MempoolStatus;
}
