//! In-memory chain adapter
//!
//! Implements the ChainView port over a vector of blocks.

use crate::domain::GENESIS_PREV_HASH;
use crate::ports::ChainView;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use shared_types::{Address, Block, Height};

/// Chain held in memory. Blocks must extend the tip in order.
pub struct InMemoryChain {
    blocks: RwLock<Vec<Block>>,
    stakes: DashMap<Address, u64>,
    default_stake: u64,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::with_default_stake(0)
    }

    /// Every address without an explicit stake reports `default_stake`.
    pub fn with_default_stake(default_stake: u64) -> Self {
        Self {
            blocks: RwLock::new(Vec::new()),
            stakes: DashMap::new(),
            default_stake,
        }
    }

    pub fn set_stake(&self, address: Address, stake: u64) {
        self.stakes.insert(address, stake);
    }

    pub fn height(&self) -> Option<Height> {
        self.blocks.read().last().map(|b| b.height)
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainView for InMemoryChain {
    async fn last_block(&self) -> Option<Block> {
        self.blocks.read().last().cloned()
    }

    async fn block_at(&self, height: Height) -> Option<Block> {
        self.blocks.read().iter().find(|b| b.height == height).cloned()
    }

    async fn adopt_block(&self, block: Block) -> Result<(), String> {
        let mut blocks = self.blocks.write();
        let parent = blocks
            .last()
            .map(|tip| tip.hash.as_str())
            .unwrap_or(GENESIS_PREV_HASH);
        if block.prev_hash != parent {
            return Err(format!(
                "block {} at height {} does not extend tip {}",
                block.hash, block.height, parent
            ));
        }
        if let Some(tip) = blocks.last() {
            if block.height != tip.height + 1 {
                return Err(format!(
                    "expected height {}, got {}",
                    tip.height + 1,
                    block.height
                ));
            }
        }
        blocks.push(block);
        Ok(())
    }

    async fn replace_tip(&self, block: Block) -> Result<Block, String> {
        let mut blocks = self.blocks.write();
        let Some(tip) = blocks.last_mut() else {
            return Err("no tip to replace".into());
        };
        if block.height != tip.height || block.prev_hash != tip.prev_hash {
            return Err(format!(
                "block {} at height {} does not compete with tip {}",
                block.hash, block.height, tip.hash
            ));
        }
        Ok(std::mem::replace(tip, block))
    }

    async fn stake_of(&self, address: &Address) -> u64 {
        self.stakes
            .get(address)
            .map(|s| *s)
            .unwrap_or(self.default_stake)
    }
}
