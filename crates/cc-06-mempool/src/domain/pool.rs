//! # Transaction Pool
//!
//! The mempool data structure. Only the admission service mutates it, and
//! always under a single lock.
//!
//! ## Data Structures
//!
//! - `by_hash`: O(1) lookup by transaction hash
//! - `by_priority`: O(log n) ordered index (rating, then age)
//! - `by_sender`: nonce-ordered hashes per sender
//! - `locked`: value committed by each sender's pending transfers
//!
//! ## Invariants
//!
//! - No duplicate hashes
//! - At most one pending transaction per (sender, nonce)
//! - `len() <= max_entries` and `total_bytes() <= max_size_bytes`
//! - `total_bytes()` equals the sum of pooled sizes

use super::entities::{Address, MempoolConfig, PooledTransaction, Rating, TxHash};
use super::errors::MempoolError;
use super::locked_balance::LockedBalanceLedger;
use super::services::can_admit;
use super::value_objects::{MempoolStatus, PriorityKey};
use shared_types::{Timestamp, Transaction, TransactionKind};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug)]
pub struct TransactionPool {
    config: MempoolConfig,
    by_hash: HashMap<TxHash, PooledTransaction>,
    by_priority: BTreeSet<PriorityKey>,
    by_sender: HashMap<Address, BTreeMap<u64, TxHash>>,
    locked: LockedBalanceLedger,
    total_bytes: usize,
}

impl TransactionPool {
    /// Creates a new empty transaction pool.
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            by_hash: HashMap::new(),
            by_priority: BTreeSet::new(),
            by_sender: HashMap::new(),
            locked: LockedBalanceLedger::new(),
            total_bytes: 0,
        }
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn status(&self) -> MempoolStatus {
        MempoolStatus {
            count: self.len(),
            size_bytes: self.total_bytes,
            max_entries: self.config.max_entries,
            max_size_bytes: self.config.max_size_bytes,
        }
    }

    pub fn get(&self, hash: &str) -> Option<&PooledTransaction> {
        self.by_hash.get(hash)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Pending transactions held for `address`.
    pub fn sender_count(&self, address: &Address) -> usize {
        self.by_sender.get(address).map(BTreeMap::len).unwrap_or(0)
    }

    /// Hash of the pending transaction using `(address, nonce)`, if any.
    pub fn nonce_holder(&self, address: &Address, nonce: u64) -> Option<&TxHash> {
        self.by_sender.get(address).and_then(|nonces| nonces.get(&nonce))
    }

    pub fn locked_balance(&self, address: &Address) -> u64 {
        self.locked.locked(address)
    }

    /// True if a transaction of `size_bytes` fits under both caps.
    pub fn can_admit(&self, size_bytes: usize) -> bool {
        can_admit(size_bytes, self.len(), self.total_bytes, &self.config)
    }

    /// Adds a rated transaction.
    ///
    /// # Errors
    /// - `DuplicateTransaction` if hash already exists
    /// - `DoubleSpend` if the sender nonce is already pending
    /// - `PoolFull` / `PoolSizeExceeded` if a cap would be exceeded
    pub fn insert(&mut self, entry: PooledTransaction) -> Result<(), MempoolError> {
        let tx = &entry.tx;
        if self.by_hash.contains_key(&tx.hash) {
            return Err(MempoolError::DuplicateTransaction(tx.hash.clone()));
        }
        if self.nonce_holder(&tx.from_address, tx.nonce).is_some() {
            return Err(MempoolError::DoubleSpend {
                address: tx.from_address.clone(),
                nonce: tx.nonce,
            });
        }
        if self.len() >= self.config.max_entries {
            return Err(MempoolError::PoolFull {
                capacity: self.config.max_entries,
            });
        }
        if !self.can_admit(entry.size_bytes) {
            return Err(MempoolError::PoolSizeExceeded {
                size: self.total_bytes + entry.size_bytes,
                limit: self.config.max_size_bytes,
            });
        }

        if tx.kind == TransactionKind::Transfer {
            self.locked.lock(&tx.from_address, tx.total_cost());
        }
        self.by_priority.insert(Self::key_of(&entry));
        self.by_sender
            .entry(tx.from_address.clone())
            .or_default()
            .insert(tx.nonce, tx.hash.clone());
        self.total_bytes += entry.size_bytes;
        self.by_hash.insert(tx.hash.clone(), entry);
        Ok(())
    }

    /// Removes a transaction and releases its locked value.
    pub fn remove(&mut self, hash: &str) -> Option<PooledTransaction> {
        let entry = self.by_hash.remove(hash)?;
        let tx = &entry.tx;

        self.by_priority.remove(&Self::key_of(&entry));
        if let Some(nonces) = self.by_sender.get_mut(&tx.from_address) {
            nonces.remove(&tx.nonce);
            if nonces.is_empty() {
                self.by_sender.remove(&tx.from_address);
            }
        }
        if tx.kind == TransactionKind::Transfer {
            self.locked.release(&tx.from_address, tx.total_cost());
        }
        self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    /// Removes every listed hash that is present; returns how many were.
    pub fn remove_many(&mut self, hashes: &[TxHash]) -> usize {
        hashes.iter().filter(|h| self.remove(h).is_some()).count()
    }

    /// Remove `address`'s transactions with a nonce below `next_nonce`.
    pub fn remove_consumed(&mut self, address: &Address, next_nonce: u64) -> Vec<TxHash> {
        let stale: Vec<TxHash> = self
            .by_sender
            .get(address)
            .map(|nonces| nonces.range(..next_nonce).map(|(_, hash)| hash.clone()).collect())
            .unwrap_or_default();
        for hash in &stale {
            self.remove(hash);
        }
        stale
    }

    /// Evict worst-rated, then oldest, transactions until the pool is at or
    /// below every given target. Returns the evicted hashes in eviction
    /// order.
    pub fn evict_lowest_priority(
        &mut self,
        target_count: Option<usize>,
        target_size: Option<usize>,
    ) -> Vec<TxHash> {
        let over = |pool: &Self| {
            target_count.is_some_and(|t| pool.len() > t)
                || target_size.is_some_and(|t| pool.total_bytes > t)
        };
        if !over(self) {
            return Vec::new();
        }

        let order = self.eviction_order();
        let mut evicted = Vec::new();
        for hash in order {
            if !over(self) {
                break;
            }
            if self.remove(&hash).is_some() {
                evicted.push(hash);
            }
        }
        evicted
    }

    /// Remove transactions whose timestamp fell out of the age window.
    pub fn expire_older_than(&mut self, cutoff: Timestamp) -> Vec<TxHash> {
        let expired: Vec<TxHash> = self
            .by_priority
            .iter()
            .filter(|k| k.timestamp < cutoff)
            .map(|k| k.hash.clone())
            .collect();
        for hash in &expired {
            self.remove(hash);
        }
        expired
    }

    /// Best transactions for a block: highest rating first, then oldest,
    /// bounded by count and total serialized size. A transaction that does
    /// not fit the remaining budget is skipped, not a stop signal.
    pub fn select_for_block(&self, max_count: usize, max_bytes: usize) -> Vec<Transaction> {
        let mut selected = Vec::new();
        let mut used_bytes = 0usize;
        for key in &self.by_priority {
            if selected.len() >= max_count {
                break;
            }
            let Some(entry) = self.by_hash.get(&key.hash) else {
                continue;
            };
            if used_bytes + entry.size_bytes > max_bytes {
                continue;
            }
            used_bytes += entry.size_bytes;
            selected.push(entry.tx.clone());
        }
        selected
    }

    fn eviction_order(&self) -> Vec<TxHash> {
        Rating::ALL
            .iter()
            .rev()
            .flat_map(|rating| {
                self.by_priority
                    .iter()
                    .filter(move |k| k.rating == *rating)
                    .map(|k| k.hash.clone())
            })
            .collect()
    }

    fn key_of(entry: &PooledTransaction) -> PriorityKey {
        PriorityKey::new(entry.rating, entry.tx.timestamp, entry.tx.hash.clone())
    }
}
