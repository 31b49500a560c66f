//! Leader election and finalization vote.
//!
//! Every honest node runs [`select_winner`] over the same proof set and gets
//! the same answer, whatever order the proofs arrived in. The finalization
//! vote then settles disagreements caused by proofs that reached only part
//! of the network.

use super::proof::verify_proof;
use shared_types::{Address, Height, Proof, WinnerClaim};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Election order: lowest VRF number, then proof hash, then address.
pub(crate) fn election_key(proof: &Proof) -> (u32, &str, &str) {
    (proof.vrf_number, proof.proof_hash.as_str(), proof.address.as_str())
}

/// Pick the leader for `current_height`.
///
/// Proofs for other heights, proofs that fail verification and proofs from
/// `banned` addresses are ignored.
pub fn select_winner(proofs: &[Proof], current_height: Height, banned: &HashSet<Address>) -> Option<Proof> {
    proofs
        .iter()
        .filter(|p| p.block_height == current_height)
        .filter(|p| verify_proof(p))
        .filter(|p| !banned.contains(&p.address))
        .min_by(|a, b| election_key(a).cmp(&election_key(b)))
        .cloned()
}

/// Tally winner claims for a height.
///
/// Claims are grouped by claimed winner address; the group with the most
/// votes wins, ties going to the lowest VRF number and then the lowest
/// address. Each voter counts once (its first claim). Claims for other
/// heights, with unverifiable proofs or naming a banned address are
/// discarded.
pub fn tally_claims(claims: &[WinnerClaim], height: Height, banned: &HashSet<Address>) -> Option<Proof> {
    let mut voted: HashSet<&Address> = HashSet::new();
    // BTreeMap keeps iteration independent of arrival order.
    let mut groups: BTreeMap<&Address, (usize, &Proof)> = BTreeMap::new();

    for claim in claims {
        let winner = &claim.winner;
        if claim.height != height
            || winner.block_height != height
            || banned.contains(&winner.address)
            || !verify_proof(winner)
        {
            continue;
        }
        if !voted.insert(&claim.voter) {
            continue;
        }
        groups
            .entry(&winner.address)
            .and_modify(|(count, best)| {
                *count += 1;
                if election_key(winner) < election_key(best) {
                    *best = winner;
                }
            })
            .or_insert((1, winner));
    }

    groups
        .into_values()
        .min_by(|(count_a, a), (count_b, b)| {
            count_b
                .cmp(count_a)
                .then_with(|| a.vrf_number.cmp(&b.vrf_number))
                .then_with(|| a.address.cmp(&b.address))
        })
        .map(|(_, proof)| proof.clone())
}

/// Claims collected for one height, first claim per voter kept.
#[derive(Debug, Clone)]
pub struct FinalizationVote {
    height: Height,
    claims: HashMap<Address, WinnerClaim>,
}

impl FinalizationVote {
    pub fn new(height: Height) -> Self {
        Self {
            height,
            claims: HashMap::new(),
        }
    }

    /// Record a claim. Returns `false` if it was discarded.
    pub fn record(&mut self, claim: WinnerClaim) -> bool {
        if claim.height != self.height || !verify_proof(&claim.winner) {
            return false;
        }
        if self.claims.contains_key(&claim.voter) {
            return false;
        }
        self.claims.insert(claim.voter.clone(), claim);
        true
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn tally(&self, banned: &HashSet<Address>) -> Option<Proof> {
        let claims: Vec<WinnerClaim> = self.claims.values().cloned().collect();
        tally_claims(&claims, self.height, banned)
    }
}
