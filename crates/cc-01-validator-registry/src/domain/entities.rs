//! # Registry Entities
//!
//! The validator record, its admission limits and the registry policy.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Timestamp, ValidatorAdvertisement};
use std::collections::BTreeSet;
use std::net::IpAddr;

// =============================================================================
// FIELD LIMITS
// =============================================================================

/// Maximum byte lengths for advertisement fields, checked before any field
/// is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLimits {
    pub address: usize,
    pub public_key: usize,
    pub signature: usize,
    pub signature_message: usize,
    /// Long enough for a textual IPv6 address.
    pub ip_address: usize,
    pub nonce: usize,
    pub unique_name: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            address: 64,
            public_key: 132,
            signature: 132,
            signature_message: 512,
            ip_address: 45,
            nonce: 64,
            unique_name: 64,
        }
    }
}

// =============================================================================
// REGISTRY POLICY
// =============================================================================

/// Which removal threshold a cleanup pass applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupContext {
    /// Routine periodic cleanup.
    Standard,
    /// Cleanup while a fork is being resolved; tolerates more failures so
    /// the caster set does not shrink mid-resolution.
    ForkChoice,
}

/// Registry sizing and removal policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Check failures at which an entry is removed.
    pub fail_threshold: u32,
    /// Removal threshold during fork resolution.
    pub fork_choice_fail_threshold: u32,
    /// Entries not seen for this long are removed (0 = never seen is kept).
    pub staleness_window_secs: i64,
    /// Broadcast lists never exceed this many entries.
    pub max_broadcast_list: usize,
    /// Hard cap on registry entries.
    pub max_validators: usize,
    /// Cap on confirming sources kept per entry.
    pub max_confirming_sources: usize,
    /// Seconds between cleanup passes.
    pub cleanup_interval_secs: u64,
    /// Seconds between validator list pushes to peers.
    pub gossip_interval_secs: u64,
    /// Advertisements older than this (or this far in the future) are refused.
    pub max_advertisement_skew_secs: i64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            fail_threshold: 5,
            fork_choice_fail_threshold: 10,
            staleness_window_secs: 3600,
            max_broadcast_list: 2000,
            max_validators: 10_000,
            max_confirming_sources: 64,
            cleanup_interval_secs: 60,
            gossip_interval_secs: 120,
            max_advertisement_skew_secs: 600,
        }
    }
}

impl RegistryConfig {
    pub fn threshold_for(&self, context: CleanupContext) -> u32 {
        match context {
            CleanupContext::Standard => self.fail_threshold,
            CleanupContext::ForkChoice => self.fork_choice_fail_threshold,
        }
    }
}

// =============================================================================
// VALIDATOR RECORDS
// =============================================================================

/// An advertisement that passed the authentication gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAdvertisement {
    pub address: Address,
    pub ip_address: IpAddr,
    pub public_key: String,
    pub signature: String,
    pub signature_message: String,
    pub unique_name: String,
    pub nonce: String,
    pub timestamp: Timestamp,
}

/// A validator known to this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkValidator {
    pub address: Address,
    pub ip_address: IpAddr,
    pub public_key: String,
    pub signature: String,
    pub signature_message: String,
    pub unique_name: String,
    pub nonce: String,
    /// Timestamp the validator signed into its advertisement.
    pub signed_at: Timestamp,
    pub check_fail_count: u32,
    /// Last heartbeat or verified resend; 0 = never seen directly.
    pub last_seen: Timestamp,
    /// Peers that vouched for this validator's IP.
    pub confirming_sources: BTreeSet<IpAddr>,
    pub first_advertised: Timestamp,
    pub last_advertised: Timestamp,
}

impl NetworkValidator {
    pub fn from_advertisement(adv: VerifiedAdvertisement, now: Timestamp) -> Self {
        Self {
            address: adv.address,
            ip_address: adv.ip_address,
            public_key: adv.public_key,
            signature: adv.signature,
            signature_message: adv.signature_message,
            unique_name: adv.unique_name,
            nonce: adv.nonce,
            signed_at: adv.timestamp,
            check_fail_count: 0,
            last_seen: 0,
            confirming_sources: BTreeSet::new(),
            first_advertised: now,
            last_advertised: now,
        }
    }

    /// The signed advertisement this entry was built from, for relaying.
    pub fn to_advertisement(&self) -> ValidatorAdvertisement {
        ValidatorAdvertisement {
            address: self.address.as_str().to_string(),
            ip_address: self.ip_address.to_string(),
            public_key: self.public_key.clone(),
            signature: self.signature.clone(),
            signature_message: self.signature_message.clone(),
            unique_name: self.unique_name.clone(),
            nonce: self.nonce.clone(),
            timestamp: self.signed_at,
        }
    }

    /// True if cleanup in the given context should drop this entry.
    pub fn is_removable(&self, now: Timestamp, config: &RegistryConfig, context: CleanupContext) -> bool {
        if self.check_fail_count >= config.threshold_for(context) {
            return true;
        }
        self.last_seen != 0 && now - self.last_seen > config.staleness_window_secs
    }
}
