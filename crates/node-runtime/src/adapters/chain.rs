//! Chain adapter for the mempool.
//!
//! Answers mined/nonce questions by scanning the in-memory chain. The
//! `_before` variants only count blocks below a height, which is how a
//! block competing with the tip is judged.

use std::sync::Arc;

use async_trait::async_trait;
use cc_06_mempool::ChainLookup;
use cc_08_consensus::InMemoryChain;
use shared_types::{Address, Block, Height};

pub struct ChainBridge {
    chain: Arc<InMemoryChain>,
}

impl ChainBridge {
    pub fn new(chain: Arc<InMemoryChain>) -> Self {
        Self { chain }
    }

    fn blocks_below(&self, height: Option<Height>) -> Vec<Block> {
        let mut blocks = self.chain.blocks();
        if let Some(height) = height {
            blocks.retain(|block| block.height < height);
        }
        blocks
    }

    fn mined_in(blocks: &[Block], tx_hash: &str) -> bool {
        blocks
            .iter()
            .flat_map(|block| block.transactions.iter())
            .any(|tx| tx.hash == tx_hash)
    }

    fn next_nonce_in(blocks: &[Block], address: &Address) -> u64 {
        blocks
            .iter()
            .flat_map(|block| block.transactions.iter())
            .filter(|tx| tx.from_address == *address)
            .map(|tx| tx.nonce + 1)
            .max()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ChainLookup for ChainBridge {
    async fn is_mined(&self, tx_hash: &str) -> Result<bool, String> {
        Ok(Self::mined_in(&self.blocks_below(None), tx_hash))
    }

    async fn next_nonce(&self, address: &Address) -> Result<u64, String> {
        Ok(Self::next_nonce_in(&self.blocks_below(None), address))
    }

    async fn is_mined_before(&self, tx_hash: &str, height: Height) -> Result<bool, String> {
        Ok(Self::mined_in(&self.blocks_below(Some(height)), tx_hash))
    }

    async fn next_nonce_before(&self, address: &Address, height: Height) -> Result<u64, String> {
        Ok(Self::next_nonce_in(&self.blocks_below(Some(height)), address))
    }
}
