//! # Core Domain Entities
//!
//! Addresses, proofs, blocks and transactions as they travel between peers.
//! Hashes are lowercase hex strings; the consensus proof hash is base64.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::IpAddr;

/// Block height.
pub type Height = u64;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

// =============================================================================
// ADDRESS
// =============================================================================

/// A validator or account address.
///
/// Addresses are opaque strings on the wire. Ordering is plain byte order,
/// which is what every deterministic tie-break relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// =============================================================================
// PROOF
// =============================================================================

/// A validator's election proof for one height.
///
/// `proof_hash` and `vrf_number` are derived from
/// `public_key || block_height || previous_block_hash`; anyone holding the
/// three inputs can recompute them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub address: Address,
    pub public_key: String,
    pub block_height: Height,
    pub previous_block_hash: String,
    pub proof_hash: String,
    pub vrf_number: u32,
    pub ip_address: IpAddr,
}

// =============================================================================
// BLOCK
// =============================================================================

/// A block as produced by the round leader and consumed by followers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: Height,
    pub hash: String,
    pub prev_hash: String,
    /// Address of the producing validator.
    pub validator: Address,
    /// The producer's winning proof hash.
    pub validator_proof: String,
    pub timestamp: Timestamp,
    /// Serialized size in bytes, filled in by the crafter.
    pub size: u64,
    /// External chain anchor reference.
    pub chain_ref_id: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Recompute the block hash from its content fields.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.height.to_string().as_bytes());
        hasher.update(self.prev_hash.as_bytes());
        hasher.update(self.validator.as_str().as_bytes());
        hasher.update(self.validator_proof.as_bytes());
        hasher.update(self.timestamp.to_string().as_bytes());
        hasher.update(self.chain_ref_id.as_bytes());
        for tx in &self.transactions {
            hasher.update(tx.hash.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Fill `hash` and `size` after the content fields are final.
    pub fn seal(mut self) -> Self {
        self.hash = self.compute_hash();
        self.size = serde_json::to_vec(&self).map(|v| v.len() as u64).unwrap_or(0);
        self
    }

    /// True if the stored hash matches the content.
    pub fn is_hash_consistent(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// Transaction category. Only transfers are subject to the fee floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Transfer,
    Stake,
    Governance,
    Contract,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Stake => "stake",
            Self::Governance => "governance",
            Self::Contract => "contract",
        }
    }

    pub fn is_fee_exempt(&self) -> bool {
        !matches!(self, Self::Transfer)
    }
}

/// A signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub from_address: Address,
    pub to_address: Address,
    pub amount: u64,
    pub fee: u64,
    pub nonce: u64,
    pub timestamp: Timestamp,
    pub kind: TransactionKind,
    pub public_key: String,
    pub signature: String,
    #[serde(default)]
    pub payload: String,
}

impl Transaction {
    /// The message the sender signs: every field except `hash` and
    /// `signature`, `|`-separated in declaration order.
    pub fn signing_message(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.from_address,
            self.to_address,
            self.amount,
            self.fee,
            self.nonce,
            self.timestamp,
            self.kind.as_str(),
            self.public_key,
            self.payload,
        )
    }

    pub fn compute_hash(&self) -> String {
        hex::encode(Sha256::digest(self.signing_message().as_bytes()))
    }

    pub fn is_hash_consistent(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// JSON-encoded size in bytes.
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }

    /// Value the sender commits: `amount + fee`, saturating.
    pub fn total_cost(&self) -> u64 {
        self.amount.saturating_add(self.fee)
    }
}
