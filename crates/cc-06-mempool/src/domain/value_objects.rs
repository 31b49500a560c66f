//! Value objects for the Mempool subsystem.
//!
//! Immutable types used for ordering and reporting.

use super::entities::{Rating, TxHash};
use shared_types::Timestamp;

/// A transaction reference in the priority index.
///
/// Orders best first: better rating, then older timestamp, then hash for
/// determinism.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriorityKey {
    pub rating: Rating,
    pub timestamp: Timestamp,
    pub hash: TxHash,
}

impl PriorityKey {
    pub fn new(rating: Rating, timestamp: Timestamp, hash: TxHash) -> Self {
        Self {
            rating,
            timestamp,
            hash,
        }
    }
}

/// Pool occupancy snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MempoolStatus {
    pub count: usize,
    pub size_bytes: usize,
    pub max_entries: usize,
    pub max_size_bytes: usize,
}
