//! Block crafting and structural checks.

use super::error::{ConsensusError, ConsensusResult};
use shared_types::{Address, Block, Height, Timestamp, Transaction};

/// `prev_hash` of the genesis block.
pub const GENESIS_PREV_HASH: &str = "0";

/// Everything the leader needs to build a block.
#[derive(Debug, Clone)]
pub struct BlockTemplate<'a> {
    pub height: Height,
    pub prev_hash: &'a str,
    pub validator: &'a Address,
    pub validator_proof: &'a str,
    pub timestamp: Timestamp,
    pub chain_ref_id: &'a str,
}

impl BlockTemplate<'_> {
    /// Build and seal the block.
    pub fn craft(&self, transactions: Vec<Transaction>) -> Block {
        Block {
            height: self.height,
            hash: String::new(),
            prev_hash: self.prev_hash.to_string(),
            validator: self.validator.clone(),
            validator_proof: self.validator_proof.to_string(),
            timestamp: self.timestamp,
            size: 0,
            chain_ref_id: self.chain_ref_id.to_string(),
            transactions,
        }
        .seal()
    }
}

/// Check a received block against the height and tip it must extend.
pub fn check_block(block: &Block, height: Height, prev_hash: &str) -> ConsensusResult<()> {
    if block.height != height {
        return Err(ConsensusError::WrongHeight {
            expected: height,
            actual: block.height,
        });
    }
    if block.prev_hash != prev_hash {
        return Err(ConsensusError::WrongParent { height });
    }
    if !block.is_hash_consistent() {
        return Err(ConsensusError::MalformedBlock(format!(
            "hash mismatch at height {}",
            height
        )));
    }
    if let Some(tx) = block.transactions.iter().find(|tx| !tx.is_hash_consistent()) {
        return Err(ConsensusError::MalformedBlock(format!(
            "transaction {} hash mismatch",
            tx.hash
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crafted() -> Block {
        let validator = Address::from("0xleader");
        BlockTemplate {
            height: 3,
            prev_hash: "tip",
            validator: &validator,
            validator_proof: "proof",
            timestamp: 1_700_000_000,
            chain_ref_id: "ref",
        }
        .craft(vec![])
    }

    #[test]
    fn test_crafted_block_is_sealed() {
        let block = crafted();
        assert!(block.is_hash_consistent());
        assert!(block.size > 0);
        assert!(check_block(&block, 3, "tip").is_ok());
    }

    #[test]
    fn test_check_block_rejects_wrong_height_and_parent() {
        let block = crafted();
        assert!(matches!(
            check_block(&block, 4, "tip"),
            Err(ConsensusError::WrongHeight { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            check_block(&block, 3, "other"),
            Err(ConsensusError::WrongParent { height: 3 })
        ));
    }

    #[test]
    fn test_check_block_rejects_tampering() {
        let mut block = crafted();
        block.validator = Address::from("0xthief");
        assert!(matches!(
            check_block(&block, 3, "tip"),
            Err(ConsensusError::MalformedBlock(_))
        ));
    }
}
