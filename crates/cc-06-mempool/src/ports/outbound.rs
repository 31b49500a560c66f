//! Outbound (Driven) ports for the Mempool subsystem.

use async_trait::async_trait;
use shared_types::{Address, Height};

/// Chain state the admission pipeline consults.
#[async_trait]
pub trait ChainLookup: Send + Sync {
    /// True if a transaction with this hash is already in a block.
    async fn is_mined(&self, tx_hash: &str) -> Result<bool, String>;

    /// The next unused nonce for `address`; lower nonces are replays.
    async fn next_nonce(&self, address: &Address) -> Result<u64, String>;

    /// `is_mined`, counting only blocks below `height`.
    async fn is_mined_before(&self, tx_hash: &str, height: Height) -> Result<bool, String>;

    /// `next_nonce`, counting only blocks below `height`.
    async fn next_nonce_before(&self, address: &Address, height: Height) -> Result<u64, String>;
}
