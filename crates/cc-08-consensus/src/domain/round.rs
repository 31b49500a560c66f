//! # Consensus Round
//!
//! One [`RoundState`] per height. It owns the proof bag, the finalization
//! vote, the approval set and the block candidates for that height, and
//! guards the phase machine:
//!
//! ```text
//! Idle -> ProofGeneration -> ProofCollection -> WinnerSelected
//!     Leader:   -> AwaitingApproval -> Finalizing -> Idle
//!     Follower: -> AwaitingBlock    -> Adopting   -> Idle
//! ```
//!
//! Any active phase may fall back to `Idle` (abandoned height). The winner
//! and the finalized block are single-slot values: the first write wins and
//! later writes are refused.
//!
//! A block candidate is kept together with the proof of its producer. Only
//! contending producers are admitted: with a winner declared, producers
//! ranked at or above it; before that, producers ranked at or above every
//! proof in the bag. The canonical block belongs to the best-ranked
//! producer, ties among its blocks broken by fork choice.

use super::block::check_block;
use super::error::{ConsensusError, ConsensusResult};
use super::fork_choice::select_canonical_at;
use super::proof::verify_proof;
use super::selector::{election_key, FinalizationVote};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use shared_types::{Address, Block, Height, Proof, Timestamp, WinnerClaim};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::OnceLock;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    Idle,
    ProofGeneration,
    ProofCollection,
    WinnerSelected,
    AwaitingApproval,
    Finalizing,
    AwaitingBlock,
    Adopting,
}

impl RoundPhase {
    pub fn can_transition_to(self, next: Self) -> bool {
        use RoundPhase::*;
        match (self, next) {
            (Idle, ProofGeneration) => true,
            (ProofGeneration, ProofCollection) => true,
            (ProofCollection, WinnerSelected) => true,
            (WinnerSelected, AwaitingApproval | AwaitingBlock) => true,
            (AwaitingApproval, Finalizing) => true,
            (AwaitingBlock, Adopting) => true,
            // The leader yields to a better producer's block.
            (AwaitingApproval | Finalizing, Adopting) => true,
            // A block for this height can arrive before we pick a winner.
            (ProofCollection | WinnerSelected, Adopting) => true,
            (Idle, _) => false,
            (_, Idle) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ProofGeneration => "proof_generation",
            Self::ProofCollection => "proof_collection",
            Self::WinnerSelected => "winner_selected",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Finalizing => "finalizing",
            Self::AwaitingBlock => "awaiting_block",
            Self::Adopting => "adopting",
        }
    }
}

/// A block offered for the round and the proof that entitles its producer.
#[derive(Debug, Clone)]
struct Candidate {
    block: Block,
    producer: Proof,
    source: IpAddr,
}

#[derive(Debug)]
pub struct RoundState {
    height: Height,
    previous_hash: String,
    begin_time: Timestamp,
    phase: Mutex<RoundPhase>,
    proofs: DashMap<Address, Proof>,
    vote: Mutex<FinalizationVote>,
    approvals: DashSet<(IpAddr, Address)>,
    winner: OnceLock<Proof>,
    finalized_block: OnceLock<Block>,
    candidates: Mutex<Vec<Candidate>>,
    excluded: Mutex<HashSet<Address>>,
    changed: Notify,
}

impl RoundState {
    pub fn new(height: Height, previous_hash: impl Into<String>, begin_time: Timestamp) -> Self {
        Self {
            height,
            previous_hash: previous_hash.into(),
            begin_time,
            phase: Mutex::new(RoundPhase::Idle),
            proofs: DashMap::new(),
            vote: Mutex::new(FinalizationVote::new(height)),
            approvals: DashSet::new(),
            winner: OnceLock::new(),
            finalized_block: OnceLock::new(),
            candidates: Mutex::new(Vec::new()),
            excluded: Mutex::new(HashSet::new()),
            changed: Notify::new(),
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn begin_time(&self) -> Timestamp {
        self.begin_time
    }

    pub fn phase(&self) -> RoundPhase {
        *self.phase.lock()
    }

    pub fn transition(&self, next: RoundPhase) -> ConsensusResult<()> {
        let mut phase = self.phase.lock();
        if !phase.can_transition_to(next) {
            return Err(ConsensusError::IllegalTransition {
                from: *phase,
                to: next,
            });
        }
        tracing::trace!(height = self.height, from = phase.as_str(), to = next.as_str(), "Round transition");
        *phase = next;
        Ok(())
    }

    /// Producers excluded from this height. Their proofs stay in the bag but
    /// never outrank a block producer.
    pub fn set_excluded(&self, excluded: HashSet<Address>) {
        *self.excluded.lock() = excluded;
    }

    /// Resolves on the next proof, claim, approval or block for this round.
    pub fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }

    fn check_height(&self, height: Height) -> ConsensusResult<()> {
        if height != self.height {
            return Err(ConsensusError::WrongHeight {
                expected: self.height,
                actual: height,
            });
        }
        Ok(())
    }

    // =========================================================================
    // PROOF BAG
    // =========================================================================

    /// Add a proof to the bag. Returns `Ok(false)` for a repeat from the
    /// same address.
    pub fn add_proof(&self, proof: Proof) -> ConsensusResult<bool> {
        self.check_height(proof.block_height)?;
        if proof.previous_block_hash != self.previous_hash {
            return Err(ConsensusError::WrongParent { height: self.height });
        }
        if !verify_proof(&proof) {
            return Err(ConsensusError::InvalidProof(proof.address));
        }
        match self.proofs.entry(proof.address.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(proof);
                self.changed.notify_waiters();
                Ok(true)
            }
        }
    }

    pub fn proofs(&self) -> Vec<Proof> {
        self.proofs.iter().map(|p| p.value().clone()).collect()
    }

    pub fn proof_count(&self) -> usize {
        self.proofs.len()
    }

    // =========================================================================
    // FINALIZATION VOTE
    // =========================================================================

    /// Record a peer's winner claim. Returns `Ok(false)` if the voter
    /// already voted.
    pub fn record_claim(&self, claim: WinnerClaim) -> ConsensusResult<bool> {
        self.check_height(claim.height)?;
        if claim.winner.previous_block_hash != self.previous_hash {
            return Err(ConsensusError::WrongParent { height: self.height });
        }
        if !verify_proof(&claim.winner) {
            return Err(ConsensusError::InvalidProof(claim.winner.address));
        }
        let recorded = self.vote.lock().record(claim);
        if recorded {
            self.changed.notify_waiters();
        }
        Ok(recorded)
    }

    pub fn claim_count(&self) -> usize {
        self.vote.lock().len()
    }

    pub fn tally(&self, banned: &HashSet<Address>) -> Option<Proof> {
        self.vote.lock().tally(banned)
    }

    // =========================================================================
    // WINNER & APPROVALS
    // =========================================================================

    /// Declare the finalized winner. Only the first declaration sticks.
    pub fn declare_winner(&self, proof: Proof) -> bool {
        self.winner.set(proof).is_ok()
    }

    pub fn winner(&self) -> Option<&Proof> {
        self.winner.get()
    }

    /// Record an approval from `(source, approver)`. Returns `false` for a
    /// repeat.
    pub fn record_approval(&self, height: Height, source: IpAddr, approver: Address) -> ConsensusResult<bool> {
        self.check_height(height)?;
        let inserted = self.approvals.insert((source, approver));
        if inserted {
            self.changed.notify_waiters();
        }
        Ok(inserted)
    }

    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }

    // =========================================================================
    // BLOCKS
    // =========================================================================

    /// Offer a block produced by `producer` for this height. Structurally
    /// bad blocks, blocks that do not carry the producer's proof and blocks
    /// from producers outranked by the round's best proof are refused. The
    /// producer's proof joins the bag.
    pub fn offer_block(&self, block: Block, producer: Proof, source: IpAddr) -> ConsensusResult<()> {
        check_block(&block, self.height, &self.previous_hash)?;
        let wrong_producer = || ConsensusError::WrongProducer {
            height: block.height,
            validator: block.validator.clone(),
        };
        if producer.address != block.validator
            || producer.proof_hash != block.validator_proof
            || producer.block_height != self.height
        {
            return Err(wrong_producer());
        }
        if !self.is_contending(&producer) {
            return Err(wrong_producer());
        }
        self.add_proof(producer.clone())?;
        {
            let mut candidates = self.candidates.lock();
            if !candidates.iter().any(|c| c.block.hash == block.hash) {
                candidates.push(Candidate {
                    block,
                    producer,
                    source,
                });
            }
        }
        self.changed.notify_waiters();
        Ok(())
    }

    fn is_contending(&self, producer: &Proof) -> bool {
        let rank = election_key(producer);
        match self.winner() {
            Some(winner) => rank <= election_key(winner),
            None => {
                let excluded = self.excluded.lock();
                self.proofs
                    .iter()
                    .filter(|p| !excluded.contains(p.key()))
                    .all(|p| rank <= election_key(p.value()))
            }
        }
    }

    /// Canonical candidate for this height, if any arrived.
    pub fn canonical_block(&self) -> Option<Block> {
        let candidates = self.candidates.lock();
        let best = candidates
            .iter()
            .filter(|c| self.is_contending(&c.producer))
            .map(|c| &c.producer)
            .min_by(|a, b| election_key(a).cmp(&election_key(b)))?;
        let blocks: Vec<(Block, IpAddr)> = candidates
            .iter()
            .filter(|c| c.producer.address == best.address)
            .map(|c| (c.block.clone(), c.source))
            .collect();
        select_canonical_at(&blocks, self.height)
    }

    /// Distinct blocks offered so far.
    pub fn candidate_count(&self) -> usize {
        self.candidates.lock().len()
    }

    /// Commit the block for this height. Only the first commit sticks.
    pub fn finalize(&self, block: Block) -> bool {
        self.finalized_block.set(block).is_ok()
    }

    pub fn finalized_block(&self) -> Option<&Block> {
        self.finalized_block.get()
    }

    /// Drop the proof bag once the height is settled.
    pub fn clear(&self) {
        self.proofs.clear();
    }
}
