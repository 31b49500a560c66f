//! # Fork Choice
//!
//! Honest nodes can end up with different blocks for one height, for
//! example when a late leader recovers while a fallback block is already
//! circulating. The canonical block is the one with the lexicographically
//! smallest hash. The rule is a total order, so every node that sees the
//! same candidates picks the same block regardless of arrival order.

use shared_types::{Block, Height};
use std::net::IpAddr;

/// Canonical block among candidates for one height.
///
/// When candidates span several heights only the lowest height present is
/// considered; later heights belong to later rounds.
pub fn select_canonical(candidates: &[(Block, IpAddr)]) -> Option<Block> {
    let height = candidates.iter().map(|(block, _)| block.height).min()?;
    select_canonical_at(candidates, height)
}

/// Canonical block among the candidates at exactly `height`.
pub fn select_canonical_at(candidates: &[(Block, IpAddr)], height: Height) -> Option<Block> {
    candidates
        .iter()
        .map(|(block, _)| block)
        .filter(|block| block.height == height)
        .min_by(|a, b| a.hash.cmp(&b.hash))
        .cloned()
}

/// Pairwise resolution used while merging candidates one at a time.
///
/// Blocks at different heights never resolve against each other.
pub fn resolve<'a>(a: &'a Block, b: &'a Block) -> Option<&'a Block> {
    if a.height != b.height {
        return None;
    }
    if a.hash <= b.hash {
        Some(a)
    } else {
        Some(b)
    }
}
