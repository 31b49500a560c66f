//! # Authentication Failure Tracker
//!
//! Per-IP failure counting with decay, rate limiting and temporary bans.
//!
//! ## Thresholds
//!
//! - `rate_limit_after` failures inside the decay window: one attempt per
//!   `rate_limit_interval_secs`
//! - `ban_after` failures: every attempt refused for `ban_duration_secs`
//!
//! A window with no new failures for `decay_window_secs` resets the count.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared_types::Timestamp;
use std::net::IpAddr;

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPenaltyConfig {
    pub decay_window_secs: i64,
    pub rate_limit_after: u32,
    pub rate_limit_interval_secs: i64,
    pub ban_after: u32,
    pub ban_duration_secs: i64,
}

impl Default for AuthPenaltyConfig {
    fn default() -> Self {
        Self {
            decay_window_secs: 600,
            rate_limit_after: 5,
            rate_limit_interval_secs: 10,
            ban_after: 20,
            ban_duration_secs: 3600,
        }
    }
}

// =============================================================================
// TRACKER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyStatus {
    Clear,
    RateLimited,
    Banned { until: Timestamp },
}

#[derive(Debug, Clone, Copy)]
struct FailureEntry {
    count: u32,
    last_failure: Timestamp,
    last_attempt: Timestamp,
    banned_until: Option<Timestamp>,
}

#[derive(Debug, Default)]
pub struct AuthFailureTracker {
    entries: DashMap<IpAddr, FailureEntry>,
    config: AuthPenaltyConfig,
}

impl AuthFailureTracker {
    pub fn new(config: AuthPenaltyConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Whether `ip` may make an attempt now. Updates the attempt clock for
    /// rate-limited sources.
    pub fn admit(&self, ip: IpAddr, now: Timestamp) -> PenaltyStatus {
        let Some(mut entry) = self.entries.get_mut(&ip) else {
            return PenaltyStatus::Clear;
        };

        if let Some(until) = entry.banned_until {
            if now < until {
                return PenaltyStatus::Banned { until };
            }
            entry.banned_until = None;
            entry.count = 0;
        }

        if now - entry.last_failure > self.config.decay_window_secs {
            entry.count = 0;
        }

        if entry.count >= self.config.rate_limit_after {
            if now - entry.last_attempt < self.config.rate_limit_interval_secs {
                return PenaltyStatus::RateLimited;
            }
            entry.last_attempt = now;
        }

        PenaltyStatus::Clear
    }

    /// Record a failed attempt; returns the resulting status.
    pub fn record_failure(&self, ip: IpAddr, now: Timestamp) -> PenaltyStatus {
        let mut entry = self.entries.entry(ip).or_insert(FailureEntry {
            count: 0,
            last_failure: now,
            last_attempt: now,
            banned_until: None,
        });

        if now - entry.last_failure > self.config.decay_window_secs {
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);
        entry.last_failure = now;
        entry.last_attempt = now;

        if entry.count >= self.config.ban_after {
            let until = now + self.config.ban_duration_secs;
            entry.banned_until = Some(until);
            tracing::warn!(peer_ip = %ip, failures = entry.count, until, "Banning source after repeated authentication failures");
            PenaltyStatus::Banned { until }
        } else if entry.count >= self.config.rate_limit_after {
            PenaltyStatus::RateLimited
        } else {
            PenaltyStatus::Clear
        }
    }

    /// Read-only ban check for callers that drop traffic before parsing.
    pub fn is_banned(&self, ip: IpAddr, now: Timestamp) -> bool {
        self.entries
            .get(&ip)
            .and_then(|e| e.banned_until)
            .is_some_and(|until| now < until)
    }

    pub fn failure_count(&self, ip: IpAddr) -> u32 {
        self.entries.get(&ip).map(|e| e.count).unwrap_or(0)
    }

    /// Drop entries whose window has decayed and whose ban has expired.
    pub fn prune(&self, now: Timestamp) -> usize {
        let before = self.entries.len();
        let decay = self.config.decay_window_secs;
        self.entries.retain(|_, e| {
            let ban_active = e.banned_until.is_some_and(|until| now < until);
            ban_active || now - e.last_failure <= decay
        });
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
