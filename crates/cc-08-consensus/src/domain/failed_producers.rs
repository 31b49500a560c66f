//! Failed producer tracking.
//!
//! A follower that waits out the block request window without a block
//! charges the elected producer one strike. Strikes decay; enough of them
//! inside the decay window exclude the address from leader election for a
//! while. Bootstrap anchors are never excluded.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Timestamp};
use std::collections::HashSet;

/// Exclusion policy, shared by every role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionPolicy {
    /// Strikes inside the decay window that trigger exclusion.
    pub strike_threshold: u32,
    /// A strike older than this resets the count.
    pub decay_window_secs: i64,
    /// How long an excluded address stays out of elections.
    pub exclusion_secs: i64,
    /// Addresses that are never excluded (at most two).
    pub bootstrap_anchors: Vec<Address>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            strike_threshold: 3,
            decay_window_secs: 30 * 60,
            exclusion_secs: 60 * 60,
            bootstrap_anchors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedProducerRecord {
    pub fail_count: u32,
    pub last_fail_time: Timestamp,
    pub excluded_until: Option<Timestamp>,
}

#[derive(Debug)]
pub struct FailedProducerTracker {
    policy: ExclusionPolicy,
    records: DashMap<Address, FailedProducerRecord>,
}

impl FailedProducerTracker {
    pub fn new(policy: ExclusionPolicy) -> Self {
        Self {
            policy,
            records: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &ExclusionPolicy {
        &self.policy
    }

    fn is_anchor(&self, address: &Address) -> bool {
        self.policy.bootstrap_anchors.contains(address)
    }

    /// Charge one no-show. Returns the strike count after charging.
    pub fn record_failure(&self, address: &Address, now: Timestamp) -> u32 {
        let mut entry = self
            .records
            .entry(address.clone())
            .or_insert(FailedProducerRecord {
                fail_count: 0,
                last_fail_time: now,
                excluded_until: None,
            });
        let record = entry.value_mut();
        if now - record.last_fail_time > self.policy.decay_window_secs {
            record.fail_count = 0;
        }
        record.fail_count = record.fail_count.saturating_add(1);
        record.last_fail_time = now;

        if record.fail_count >= self.policy.strike_threshold && !self.is_anchor(address) {
            let until = now + self.policy.exclusion_secs;
            if record.excluded_until.is_none_or(|t| t < until) {
                record.excluded_until = Some(until);
                tracing::warn!(
                    producer = %address,
                    strikes = record.fail_count,
                    excluded_until = until,
                    "Producer excluded from leader election"
                );
            }
        }
        record.fail_count
    }

    /// A delivered block clears the producer's strikes.
    pub fn record_success(&self, address: &Address) {
        self.records.remove(address);
    }

    pub fn failure_count(&self, address: &Address) -> u32 {
        self.records.get(address).map(|r| r.fail_count).unwrap_or(0)
    }

    pub fn is_excluded(&self, address: &Address, now: Timestamp) -> bool {
        self.records
            .get(address)
            .and_then(|r| r.excluded_until)
            .is_some_and(|until| now < until)
    }

    /// Addresses to skip in the next election.
    pub fn exclusion_set(&self, now: Timestamp) -> HashSet<Address> {
        self.records
            .iter()
            .filter(|r| r.excluded_until.is_some_and(|until| now < until))
            .map(|r| r.key().clone())
            .collect()
    }

    /// Drop records whose strikes decayed and whose exclusion lapsed.
    pub fn prune(&self, now: Timestamp) -> usize {
        let before = self.records.len();
        let decay = self.policy.decay_window_secs;
        self.records.retain(|_, r| {
            let excluded = r.excluded_until.is_some_and(|until| now < until);
            excluded || now - r.last_fail_time <= decay
        });
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
