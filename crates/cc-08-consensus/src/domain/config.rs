//! Consensus configuration.

use super::cadence::Cadence;
use super::error::{ConsensusError, ConsensusResult};
use super::failed_producers::ExclusionPolicy;
use serde::{Deserialize, Serialize};
use shared_types::{Height, Timestamp};
use std::time::Duration;

/// Round timers, quorum, cadence and block limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Window after the local claim before claims are tallied.
    pub proof_collection_time_ms: u64,
    /// How long the leader collects approvals.
    pub approval_window_ms: u64,
    /// How long a follower polls for the block.
    pub block_request_window_ms: u64,
    /// How long proofs are gathered before the local winner is computed.
    pub proof_gossip_window_ms: u64,
    /// Pause between block fetch attempts.
    pub block_poll_interval_ms: u64,
    /// After the first block for a height arrives, how long competitors
    /// may still join before the canonical one is committed.
    pub block_settle_window_ms: u64,

    /// Per-call timeout for peer RPCs.
    pub peer_call_timeout_ms: u64,
    /// Attempts per peer call, including the first.
    pub peer_retry_attempts: u32,
    pub peer_retry_backoff_ms: u64,
    /// Concurrent sends during a broadcast.
    pub fanout_concurrency: usize,

    /// Fraction of the casting set (leader included) that must approve.
    pub approval_quorum: f64,
    /// Stake required to submit a proof.
    pub min_stake: u64,

    pub block_time_secs: i64,
    pub block_time_min_secs: i64,
    pub block_time_max_secs: i64,
    pub epoch_timestamp: Timestamp,
    pub genesis_height: Height,
    /// External chain anchor written into crafted blocks.
    pub chain_ref_id: String,

    pub max_block_transactions: usize,
    pub max_block_tx_bytes: usize,

    pub exclusion: ExclusionPolicy,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            proof_collection_time_ms: 7_000,
            approval_window_ms: 12_000,
            block_request_window_ms: 12_000,
            proof_gossip_window_ms: 3_000,
            block_poll_interval_ms: 1_000,
            block_settle_window_ms: 1_000,
            peer_call_timeout_ms: 2_000,
            peer_retry_attempts: 2,
            peer_retry_backoff_ms: 250,
            fanout_concurrency: 32,
            approval_quorum: 0.51,
            min_stake: 0,
            block_time_secs: 10,
            block_time_min_secs: 2,
            block_time_max_secs: 30,
            epoch_timestamp: 0,
            genesis_height: 0,
            chain_ref_id: String::new(),
            max_block_transactions: 1_000,
            max_block_tx_bytes: 1_000_000,
            exclusion: ExclusionPolicy::default(),
        }
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

impl ConsensusConfig {
    /// Short timers for tests.
    pub fn for_testing() -> Self {
        Self {
            proof_collection_time_ms: 700,
            approval_window_ms: 1_200,
            block_request_window_ms: 1_200,
            proof_gossip_window_ms: 300,
            block_poll_interval_ms: 100,
            block_settle_window_ms: 100,
            peer_call_timeout_ms: 200,
            peer_retry_backoff_ms: 20,
            block_time_secs: 1,
            block_time_min_secs: 1,
            block_time_max_secs: 1,
            ..Self::default()
        }
    }

    pub fn proof_collection_time(&self) -> Duration {
        ms(self.proof_collection_time_ms)
    }

    pub fn approval_window(&self) -> Duration {
        ms(self.approval_window_ms)
    }

    pub fn block_request_window(&self) -> Duration {
        ms(self.block_request_window_ms)
    }

    pub fn proof_gossip_window(&self) -> Duration {
        ms(self.proof_gossip_window_ms)
    }

    pub fn block_poll_interval(&self) -> Duration {
        ms(self.block_poll_interval_ms)
    }

    pub fn block_settle_window(&self) -> Duration {
        ms(self.block_settle_window_ms)
    }

    pub fn peer_call_timeout(&self) -> Duration {
        ms(self.peer_call_timeout_ms)
    }

    pub fn peer_retry_backoff(&self) -> Duration {
        ms(self.peer_retry_backoff_ms)
    }

    pub fn cadence(&self) -> Cadence {
        Cadence {
            block_time_secs: self.block_time_secs,
            min_secs: self.block_time_min_secs,
            max_secs: self.block_time_max_secs,
            epoch: self.epoch_timestamp,
            genesis_height: self.genesis_height,
        }
    }

    /// True if `approvals` out of `casters` meets the quorum.
    pub fn quorum_met(&self, approvals: usize, casters: usize) -> bool {
        casters > 0 && approvals as f64 / casters as f64 >= self.approval_quorum
    }

    /// Startup check; a bad value stops the node before any round runs.
    pub fn validate(&self) -> ConsensusResult<()> {
        let timers = [
            ("proof_collection_time_ms", self.proof_collection_time_ms),
            ("approval_window_ms", self.approval_window_ms),
            ("block_request_window_ms", self.block_request_window_ms),
            ("proof_gossip_window_ms", self.proof_gossip_window_ms),
            ("block_poll_interval_ms", self.block_poll_interval_ms),
            ("block_settle_window_ms", self.block_settle_window_ms),
            ("peer_call_timeout_ms", self.peer_call_timeout_ms),
        ];
        if let Some((name, _)) = timers.iter().find(|(_, v)| *v == 0) {
            return Err(ConsensusError::InvalidConfig(format!("{} must be positive", name)));
        }
        if self.block_time_secs <= 0 || self.block_time_min_secs <= 0 {
            return Err(ConsensusError::InvalidConfig(
                "block times must be positive".into(),
            ));
        }
        if self.block_time_min_secs > self.block_time_max_secs {
            return Err(ConsensusError::InvalidConfig(format!(
                "block_time_min_secs {} exceeds block_time_max_secs {}",
                self.block_time_min_secs, self.block_time_max_secs
            )));
        }
        if !(self.approval_quorum > 0.0 && self.approval_quorum <= 1.0) {
            return Err(ConsensusError::InvalidConfig(format!(
                "approval_quorum {} outside (0, 1]",
                self.approval_quorum
            )));
        }
        if self.peer_retry_attempts == 0 || self.fanout_concurrency == 0 {
            return Err(ConsensusError::InvalidConfig(
                "peer_retry_attempts and fanout_concurrency must be positive".into(),
            ));
        }
        if self.max_block_transactions == 0 || self.max_block_tx_bytes == 0 {
            return Err(ConsensusError::InvalidConfig("block caps must be positive".into()));
        }
        let policy = &self.exclusion;
        if policy.strike_threshold == 0 || policy.decay_window_secs <= 0 || policy.exclusion_secs <= 0 {
            return Err(ConsensusError::InvalidConfig(
                "exclusion policy values must be positive".into(),
            ));
        }
        if policy.bootstrap_anchors.len() > 2 {
            return Err(ConsensusError::InvalidConfig(format!(
                "at most 2 bootstrap anchors, got {}",
                policy.bootstrap_anchors.len()
            )));
        }
        Ok(())
    }
}
