//! # Mempool Service
//!
//! Admission pipeline, block selection and the periodic eviction loop.
//!
//! Checks run cheapest first so a flood of junk never reaches signature
//! verification:
//!
//! ```text
//! rejection cache -> block-list -> staleness -> pooled/mined
//!   -> hash -> key/signature -> nonce -> rating -> caps -> insert
//! ```


use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cc_telemetry::{MEMPOOL_ADMISSIONS, MEMPOOL_BYTES, MEMPOOL_SIZE};
use parking_lot::Mutex;
use shared_types::{Address, AddressBlockList, Height, SignatureVerifier, TimeSource, Transaction};
use tokio::sync::watch;

use crate::domain::{
    assign_rating, check_staleness, minimum_fee_ok, required_fee, MempoolConfig, MempoolError,
    MempoolStatus, PooledTransaction, RejectionCache, TransactionPool, TxHash,
};
use crate::ports::{ChainLookup, MempoolApi};

pub struct MempoolService {
    pool: Mutex<TransactionPool>,
    rejected: Mutex<RejectionCache>,
    verifier: Arc<dyn SignatureVerifier>,
    block_list: Arc<dyn AddressBlockList>,
    chain: Arc<dyn ChainLookup>,
    time_source: Arc<dyn TimeSource>,
}

impl MempoolService {
    pub fn new(
        config: MempoolConfig,
        verifier: Arc<dyn SignatureVerifier>,
        block_list: Arc<dyn AddressBlockList>,
        chain: Arc<dyn ChainLookup>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let now = time_source.now();
        let rejected = RejectionCache::with_params(
            now,
            config.rejection_ttl_secs,
            config.rejection_cache_capacity,
        );
        Self {
            pool: Mutex::new(TransactionPool::new(config)),
            rejected: Mutex::new(rejected),
            verifier,
            block_list,
            chain,
            time_source,
        }
    }

    pub fn config(&self) -> MempoolConfig {
        self.pool.lock().config().clone()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.pool.lock().contains(hash)
    }

    /// Value locked by pending transfers of `address`.
    pub fn locked_balance(&self, address: &shared_types::Address) -> u64 {
        self.pool.lock().locked_balance(address)
    }

    /// Run the admission pipeline. Permanent failures are remembered so a
    /// rebroadcast is dropped at the first check.
    pub async fn admit(&self, tx: Transaction) -> Result<TxHash, MempoolError> {
        let hash = tx.hash.clone();
        let result = self.admit_inner(tx).await;
        match &result {
            Ok(_) => {
                MEMPOOL_ADMISSIONS.with_label_values(&["admitted"]).inc();
                tracing::debug!(tx_hash = %hash, "Transaction admitted");
            }
            Err(e) => {
                MEMPOOL_ADMISSIONS.with_label_values(&["rejected"]).inc();
                if e.is_permanent() {
                    self.rejected.lock().mark_rejected(hash.clone(), self.time_source.now());
                }
                tracing::debug!(tx_hash = %hash, error = %e, kind = e.kind().as_str(), "Transaction rejected");
            }
        }
        self.publish_gauges();
        result
    }

    async fn admit_inner(&self, tx: Transaction) -> Result<TxHash, MempoolError> {
        let now = self.time_source.now();
        let config = self.config();

        if self.rejected.lock().is_rejected(&tx.hash) {
            return Err(MempoolError::PreviouslyRejected(tx.hash));
        }
        if self.block_list.is_blocked(&tx.from_address) {
            return Err(MempoolError::BlockedAddress(tx.from_address));
        }
        check_staleness(tx.timestamp, now, &config)?;

        let mined = self
            .chain
            .is_mined(&tx.hash)
            .await
            .map_err(MempoolError::ChainLookup)?;
        if mined {
            // A pooled copy that has since been mined is dropped here too.
            self.pool.lock().remove(&tx.hash);
            return Err(MempoolError::AlreadyMined(tx.hash));
        }
        if self.pool.lock().contains(&tx.hash) {
            return Err(MempoolError::DuplicateTransaction(tx.hash));
        }

        if !tx.is_hash_consistent() {
            return Err(MempoolError::HashMismatch(tx.hash));
        }
        self.check_signature(&tx)?;

        let next_nonce = self
            .chain
            .next_nonce(&tx.from_address)
            .await
            .map_err(MempoolError::ChainLookup)?;
        if tx.nonce < next_nonce {
            return Err(MempoolError::Replay {
                address: tx.from_address,
                nonce: tx.nonce,
            });
        }

        // No await past this point: the pool lock is held to the insert.
        let mut pool = self.pool.lock();
        if pool.nonce_holder(&tx.from_address, tx.nonce).is_some() {
            return Err(MempoolError::DoubleSpend {
                address: tx.from_address,
                nonce: tx.nonce,
            });
        }

        let size_bytes = tx.serialized_size();
        let pending = pool.sender_count(&tx.from_address);
        let rating = assign_rating(&tx, size_bytes, pending, &config);
        if !rating.is_admissible() {
            return Err(Self::explain_rejection(&tx, size_bytes, pending, &config));
        }

        let entry = PooledTransaction::new(tx, rating, now);
        let hash = entry.tx.hash.clone();
        pool.insert(entry)?;
        Ok(hash)
    }

    /// Validate the contents of a block proposed at `height`. Chain lookups
    /// only count blocks below `height`, so a block competing for the
    /// current tip is judged against its own parent.
    pub async fn check_block_transactions(
        &self,
        height: Height,
        transactions: &[Transaction],
    ) -> Result<(), MempoolError> {
        let mut spent: HashSet<(&Address, u64)> = HashSet::new();
        let mut floors: HashMap<&Address, u64> = HashMap::new();

        for tx in transactions {
            if !tx.is_hash_consistent() {
                return Err(MempoolError::HashMismatch(tx.hash.clone()));
            }
            if self.block_list.is_blocked(&tx.from_address) {
                return Err(MempoolError::BlockedAddress(tx.from_address.clone()));
            }
            if !spent.insert((&tx.from_address, tx.nonce)) {
                return Err(MempoolError::DoubleSpend {
                    address: tx.from_address.clone(),
                    nonce: tx.nonce,
                });
            }
            self.check_signature(tx)?;

            let floor = match floors.get(&tx.from_address) {
                Some(floor) => *floor,
                None => {
                    let floor = self
                        .chain
                        .next_nonce_before(&tx.from_address, height)
                        .await
                        .map_err(MempoolError::ChainLookup)?;
                    floors.insert(&tx.from_address, floor);
                    floor
                }
            };
            if tx.nonce < floor {
                return Err(MempoolError::Replay {
                    address: tx.from_address.clone(),
                    nonce: tx.nonce,
                });
            }

            let mined = self
                .chain
                .is_mined_before(&tx.hash, height)
                .await
                .map_err(MempoolError::ChainLookup)?;
            if mined {
                return Err(MempoolError::AlreadyMined(tx.hash.clone()));
            }
        }
        Ok(())
    }

    /// Drop the block's transactions, then every pooled transaction whose
    /// sender nonce the block consumed.
    pub fn purge_included(&self, transactions: &[Transaction]) -> usize {
        let hashes: Vec<TxHash> = transactions.iter().map(|tx| tx.hash.clone()).collect();
        let mut consumed: HashMap<&Address, u64> = HashMap::new();
        for tx in transactions {
            let next = consumed.entry(&tx.from_address).or_insert(0);
            *next = (*next).max(tx.nonce + 1);
        }

        let removed = {
            let mut pool = self.pool.lock();
            let mut removed = pool.remove_many(&hashes);
            for (address, next_nonce) in consumed {
                let stale = pool.remove_consumed(address, next_nonce);
                if !stale.is_empty() {
                    tracing::debug!(%address, dropped = stale.len(), "Dropped pooled transactions with consumed nonces");
                }
                removed += stale.len();
            }
            removed
        };
        self.publish_gauges();
        removed
    }

    fn check_signature(&self, tx: &Transaction) -> Result<(), MempoolError> {
        let derived = self.verifier.derive_address(&tx.public_key);
        if derived.as_ref() != Some(&tx.from_address) {
            return Err(MempoolError::InvalidSignature(tx.hash.clone()));
        }
        if !self
            .verifier
            .verify(&tx.from_address, tx.signing_message().as_bytes(), &tx.signature)
        {
            return Err(MempoolError::InvalidSignature(tx.hash.clone()));
        }
        Ok(())
    }

    fn explain_rejection(
        tx: &Transaction,
        size_bytes: usize,
        pending: usize,
        config: &MempoolConfig,
    ) -> MempoolError {
        if pending >= config.max_per_sender {
            MempoolError::SenderQuotaFull {
                address: tx.from_address.clone(),
                limit: config.max_per_sender,
            }
        } else if !minimum_fee_ok(tx, config.min_fee_per_kb) {
            MempoolError::FeeTooLow {
                fee: tx.fee,
                required: required_fee(size_bytes, config.min_fee_per_kb),
            }
        } else {
            MempoolError::RatingTooLow(tx.hash.clone())
        }
    }

    /// Expire aged transactions, then evict down to the configured fraction
    /// of each cap. Returns the number of transactions removed.
    pub fn evict_once(&self) -> usize {
        let now = self.time_source.now();
        let removed = {
            let mut pool = self.pool.lock();
            let config = pool.config().clone();
            let expired = if config.historical_import {
                Vec::new()
            } else {
                pool.expire_older_than(now - config.max_tx_age_secs)
            };
            let target_count = (config.max_entries as f64 * config.eviction_target_ratio) as usize;
            let target_size = (config.max_size_bytes as f64 * config.eviction_target_ratio) as usize;
            let evicted = pool.evict_lowest_priority(Some(target_count), Some(target_size));
            if !expired.is_empty() || !evicted.is_empty() {
                tracing::info!(
                    expired = expired.len(),
                    evicted = evicted.len(),
                    remaining = pool.len(),
                    "Mempool eviction pass"
                );
            }
            expired.len() + evicted.len()
        };
        self.rejected.lock().maybe_roll(now);
        if removed > 0 {
            MEMPOOL_ADMISSIONS
                .with_label_values(&["evicted"])
                .inc_by(removed as f64);
        }
        self.publish_gauges();
        removed
    }

    /// Run eviction every `interval` until `shutdown` flips to `true`.
    pub async fn run_eviction_loop(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.evict_once();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Mempool eviction loop stopped");
                        return;
                    }
                }
            }
        }
    }

    fn publish_gauges(&self) {
        let status = self.pool.lock().status();
        MEMPOOL_SIZE.set(status.count as f64);
        MEMPOOL_BYTES.set(status.size_bytes as f64);
    }
}

#[async_trait]
impl MempoolApi for MempoolService {
    async fn submit(&self, tx: Transaction) -> Result<TxHash, MempoolError> {
        self.admit(tx).await
    }

    fn select_for_block(&self, max_count: usize, max_bytes: usize) -> Vec<Transaction> {
        self.pool.lock().select_for_block(max_count, max_bytes)
    }

    async fn validate_block(&self, height: Height, transactions: &[Transaction]) -> Result<(), MempoolError> {
        self.check_block_transactions(height, transactions).await
    }

    fn remove_included(&self, transactions: &[Transaction]) -> usize {
        self.purge_included(transactions)
    }

    fn evict_lowest_priority(&self, target_count: Option<usize>, target_size: Option<usize>) -> Vec<TxHash> {
        let evicted = self
            .pool
            .lock()
            .evict_lowest_priority(target_count, target_size);
        if !evicted.is_empty() {
            MEMPOOL_ADMISSIONS
                .with_label_values(&["evicted"])
                .inc_by(evicted.len() as f64);
        }
        self.publish_gauges();
        evicted
    }

    fn status(&self) -> MempoolStatus {
        self.pool.lock().status()
    }
}
