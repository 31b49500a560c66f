//! # Validator Registry
//!
//! Process-wide table of known validators keyed by address. Every mutation
//! is a single per-entry operation on a `DashMap` shard, so heartbeats,
//! advertisements and cleanup can run from different tasks.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::{Address, Timestamp};
use std::cmp::Reverse;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::entities::{CleanupContext, NetworkValidator, RegistryConfig, VerifiedAdvertisement};
use super::errors::RegistryError;

/// Result of recording a verified advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug)]
pub struct ValidatorRegistry {
    entries: DashMap<Address, NetworkValidator>,
    /// Slots taken, reserved before an insert. `DashMap::len` would lock
    /// every shard, including the one the entry guard holds.
    occupied: AtomicUsize,
    config: RegistryConfig,
}

impl ValidatorRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            entries: DashMap::new(),
            occupied: AtomicUsize::new(0),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Insert a new validator or refresh an existing one.
    ///
    /// A verified resend counts as being seen. New entries are refused once
    /// the registry holds `max_validators`.
    pub fn upsert(
        &self,
        adv: VerifiedAdvertisement,
        now: Timestamp,
    ) -> Result<UpsertOutcome, RegistryError> {
        let outcome = match self.entries.entry(adv.address.clone()) {
            Entry::Occupied(mut occupied) => {
                let v = occupied.get_mut();
                v.ip_address = adv.ip_address;
                v.public_key = adv.public_key;
                v.signature = adv.signature;
                v.signature_message = adv.signature_message;
                v.unique_name = adv.unique_name;
                v.nonce = adv.nonce;
                v.signed_at = adv.timestamp;
                v.last_advertised = now;
                v.last_seen = now;
                UpsertOutcome::Updated
            }
            Entry::Vacant(vacant) => {
                self.reserve_slot()?;
                vacant.insert(NetworkValidator::from_advertisement(adv, now));
                UpsertOutcome::Inserted
            }
        };
        self.publish_size();
        Ok(outcome)
    }

    fn reserve_slot(&self) -> Result<(), RegistryError> {
        let capacity = self.config.max_validators;
        self.occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| {
                (taken < capacity).then_some(taken + 1)
            })
            .map(|_| ())
            .map_err(|_| RegistryError::Full { capacity })
    }

    /// Record a peer that vouched for the validator's IP. Does not count as
    /// seeing the validator.
    pub fn add_confirming_source(&self, address: &Address, source: IpAddr) -> Result<(), RegistryError> {
        let mut entry = self
            .entries
            .get_mut(address)
            .ok_or_else(|| RegistryError::UnknownValidator(address.clone()))?;
        if entry.confirming_sources.len() < self.config.max_confirming_sources {
            entry.confirming_sources.insert(source);
        }
        Ok(())
    }

    /// Direct contact with the validator succeeded: refresh `last_seen` and
    /// clear its check failures.
    pub fn mark_seen(&self, address: &Address, now: Timestamp) -> Result<(), RegistryError> {
        let mut entry = self
            .entries
            .get_mut(address)
            .ok_or_else(|| RegistryError::UnknownValidator(address.clone()))?;
        entry.last_seen = now;
        entry.check_fail_count = 0;
        Ok(())
    }

    /// Count a failed liveness/consistency check; returns the new count.
    pub fn record_check_failure(&self, address: &Address) -> Result<u32, RegistryError> {
        let mut entry = self
            .entries
            .get_mut(address)
            .ok_or_else(|| RegistryError::UnknownValidator(address.clone()))?;
        entry.check_fail_count = entry.check_fail_count.saturating_add(1);
        Ok(entry.check_fail_count)
    }

    /// Remove failed and stale entries; returns the removed addresses.
    pub fn cleanup(&self, now: Timestamp, context: CleanupContext) -> Vec<Address> {
        let mut removed = Vec::new();
        self.entries.retain(|address, v| {
            if v.is_removable(now, &self.config, context) {
                removed.push(address.clone());
                false
            } else {
                true
            }
        });
        self.occupied.fetch_sub(removed.len(), Ordering::AcqRel);
        removed.sort();
        self.publish_size();
        removed
    }

    /// Entries to share with peers, best first, capped at
    /// `max_broadcast_list`.
    ///
    /// Priority: fewest check failures, then most confirming sources, then
    /// most recent advertisement. Address breaks the remaining ties.
    pub fn broadcast_list(&self) -> Vec<NetworkValidator> {
        let mut list: Vec<NetworkValidator> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        list.sort_by(|a, b| {
            a.check_fail_count
                .cmp(&b.check_fail_count)
                .then_with(|| b.confirming_sources.len().cmp(&a.confirming_sources.len()))
                .then_with(|| b.last_advertised.cmp(&a.last_advertised))
                .then_with(|| a.address.cmp(&b.address))
        });
        list.truncate(self.config.max_broadcast_list);
        list
    }

    /// Addresses eligible to take part in rounds, sorted.
    pub fn casting_set(&self) -> Vec<Address> {
        let mut set: Vec<Address> = self
            .entries
            .iter()
            .filter(|e| e.check_fail_count < self.config.fail_threshold)
            .map(|e| e.key().clone())
            .collect();
        set.sort();
        set
    }

    /// IPs of every entry except `exclude`, most reliable first.
    pub fn peer_ips(&self, exclude: Option<&Address>) -> Vec<IpAddr> {
        let mut peers: Vec<(u32, Reverse<Timestamp>, IpAddr)> = self
            .entries
            .iter()
            .filter(|e| Some(e.key()) != exclude)
            .map(|e| (e.check_fail_count, Reverse(e.last_seen), e.ip_address))
            .collect();
        peers.sort();
        peers.into_iter().map(|(_, _, ip)| ip).collect()
    }

    pub fn get(&self, address: &Address) -> Option<NetworkValidator> {
        self.entries.get(address).map(|e| e.value().clone())
    }

    pub fn ip_of(&self, address: &Address) -> Option<IpAddr> {
        self.entries.get(address).map(|e| e.ip_address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn publish_size(&self) {
        cc_telemetry::REGISTRY_SIZE.set(self.entries.len() as f64);
    }
}
