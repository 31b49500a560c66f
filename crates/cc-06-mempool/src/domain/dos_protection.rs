//! # Rejection Cache (Anti-CPU DoS)
//!
//! Attackers rebroadcast the same invalid transaction from many peers. Each
//! copy would cost a signature check. Rejected hashes go into a rolling
//! two-generation set checked before any expensive work.
//!
//! ## Rolling
//!
//! The current generation becomes the previous one every `ttl` seconds (or
//! when it fills up), and the old previous generation is dropped. A hash is
//! therefore remembered for between one and two `ttl` periods.

use super::entities::TxHash;
use shared_types::Timestamp;
use std::collections::HashSet;

#[derive(Debug)]
pub struct RejectionCache {
    current: HashSet<TxHash>,
    previous: HashSet<TxHash>,
    last_roll: Timestamp,
    ttl_secs: i64,
    max_entries: usize,
}

/// Default roll interval (1 hour).
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Default max entries per generation.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

impl RejectionCache {
    pub fn new(now: Timestamp) -> Self {
        Self::with_params(now, DEFAULT_TTL_SECS, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_params(now: Timestamp, ttl_secs: i64, max_entries: usize) -> Self {
        Self {
            current: HashSet::new(),
            previous: HashSet::new(),
            last_roll: now,
            ttl_secs,
            max_entries: max_entries.max(1),
        }
    }

    /// True if the hash was rejected recently.
    pub fn is_rejected(&self, tx_hash: &str) -> bool {
        self.current.contains(tx_hash) || self.previous.contains(tx_hash)
    }

    pub fn mark_rejected(&mut self, tx_hash: TxHash, now: Timestamp) {
        self.maybe_roll(now);
        if self.current.len() >= self.max_entries {
            self.roll(now);
        }
        self.current.insert(tx_hash);
    }

    pub fn maybe_roll(&mut self, now: Timestamp) {
        if now - self.last_roll >= self.ttl_secs {
            self.roll(now);
        }
    }

    fn roll(&mut self, now: Timestamp) {
        self.previous = std::mem::take(&mut self.current);
        self.last_roll = now;
    }

    pub fn len(&self) -> usize {
        self.current.len() + self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }
}
