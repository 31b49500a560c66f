//! Core entities for the Mempool subsystem.

use serde::{Deserialize, Serialize};
use shared_types::{Timestamp, Transaction};
use std::fmt;

pub use shared_types::Address;

/// Transaction hash (lowercase hex).
pub type TxHash = String;

// =============================================================================
// RATING
// =============================================================================

/// Admission rating. `A` is the best; `F` is never admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Rating {
    /// All ratings, best first.
    pub const ALL: [Rating; 6] = [Self::A, Self::B, Self::C, Self::D, Self::E, Self::F];

    /// One letter worse; `F` stays `F`.
    pub fn downgrade(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::C,
            Self::C => Self::D,
            Self::D => Self::E,
            Self::E | Self::F => Self::F,
        }
    }

    pub fn is_admissible(self) -> bool {
        self != Self::F
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
        };
        f.write_str(letter)
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Mempool configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum pooled transactions.
    pub max_entries: usize,
    /// Maximum total serialized size of pooled transactions.
    pub max_size_bytes: usize,
    /// Fee floor for transfers, per started kilobyte.
    pub min_fee_per_kb: u64,
    /// Oldest accepted transaction timestamp, relative to now.
    pub max_tx_age_secs: i64,
    /// How far ahead of now a timestamp may be.
    pub max_future_skew_secs: i64,
    /// Pending transactions allowed per sender.
    pub max_per_sender: usize,
    /// Skip the age bound (replaying history).
    pub historical_import: bool,
    /// Seconds between eviction passes.
    pub eviction_interval_secs: u64,
    /// Eviction trims the pool to this fraction of each cap.
    pub eviction_target_ratio: f64,
    /// How long a rejected hash is remembered.
    pub rejection_ttl_secs: i64,
    /// Rejected hashes kept per generation.
    pub rejection_cache_capacity: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_size_bytes: 64 * 1024 * 1024,
            min_fee_per_kb: 1,
            max_tx_age_secs: 6 * 3600,
            max_future_skew_secs: 120,
            max_per_sender: 64,
            historical_import: false,
            eviction_interval_secs: 30,
            eviction_target_ratio: 0.9,
            rejection_ttl_secs: 3600,
            rejection_cache_capacity: 100_000,
        }
    }
}

impl MempoolConfig {
    /// Creates a config for testing with small limits.
    pub fn for_testing() -> Self {
        Self {
            max_entries: 100,
            max_size_bytes: 1024 * 1024,
            min_fee_per_kb: 10,
            max_per_sender: 8,
            ..Self::default()
        }
    }
}

// =============================================================================
// POOLED TRANSACTION
// =============================================================================

/// A transaction held in the pool together with its admission metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PooledTransaction {
    pub tx: Transaction,
    pub rating: Rating,
    /// Serialized size in bytes, computed once at admission.
    pub size_bytes: usize,
    pub admitted_at: Timestamp,
}

impl PooledTransaction {
    pub fn new(tx: Transaction, rating: Rating, admitted_at: Timestamp) -> Self {
        let size_bytes = tx.serialized_size();
        Self {
            tx,
            rating,
            size_bytes,
            admitted_at,
        }
    }

    pub fn hash(&self) -> &str {
        &self.tx.hash
    }
}
