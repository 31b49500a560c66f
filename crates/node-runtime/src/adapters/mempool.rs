//! Mempool adapter for consensus.

use std::sync::Arc;

use async_trait::async_trait;
use cc_06_mempool::{MempoolApi, MempoolService};
use cc_08_consensus::MempoolGateway;
use shared_types::{Block, Transaction};

pub struct MempoolBridge {
    service: Arc<MempoolService>,
}

impl MempoolBridge {
    pub fn new(service: Arc<MempoolService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl MempoolGateway for MempoolBridge {
    async fn submit(&self, tx: Transaction) -> Result<(), String> {
        self.service
            .submit(tx)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn select_for_block(&self, max_count: usize, max_bytes: usize) -> Vec<Transaction> {
        MempoolApi::select_for_block(self.service.as_ref(), max_count, max_bytes)
    }

    async fn validate_block_transactions(&self, block: &Block) -> Result<(), String> {
        MempoolApi::validate_block(self.service.as_ref(), block.height, &block.transactions)
            .await
            .map_err(|e| e.to_string())
    }

    async fn remove_included(&self, transactions: &[Transaction]) {
        let removed = MempoolApi::remove_included(self.service.as_ref(), transactions);
        tracing::debug!(included = transactions.len(), removed, "Mined transactions left the pool");
    }
}
