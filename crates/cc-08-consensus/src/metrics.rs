//! # Consensus Metrics
//!
//! Prometheus metrics for round-level consensus activity.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! cc-08-consensus = { workspace = true, features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `cc_consensus_rounds_total` - Counter of finished heights (by outcome)
//! - `cc_consensus_proofs_received_total` - Counter of accepted peer proofs
//! - `cc_consensus_round_duration_seconds` - Histogram of height durations
//! - `cc_consensus_approval_ratio` - Approval ratio seen by the last leader round

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_int_counter, CounterVec,
    Gauge, Histogram, IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Finished heights, labeled by outcome
    pub static ref ROUNDS_TOTAL: CounterVec = register_counter_vec!(
        "cc_consensus_rounds_total",
        "Heights finished by the consensus loop",
        &["outcome"]
    )
    .expect("Failed to create ROUNDS_TOTAL metric");

    /// Proofs accepted into a round's bag
    pub static ref PROOFS_RECEIVED: IntCounter = register_int_counter!(
        "cc_consensus_proofs_received_total",
        "Peer proofs accepted into the proof bag"
    )
    .expect("Failed to create PROOFS_RECEIVED metric");

    /// Wall time per height
    pub static ref ROUND_DURATION: Histogram = register_histogram!(
        "cc_consensus_round_duration_seconds",
        "Time from round start to outcome in seconds",
        vec![1.0, 2.5, 5.0, 10.0, 15.0, 20.0, 30.0, 45.0, 60.0]
    )
    .expect("Failed to create ROUND_DURATION metric");

    /// Approvals over casting set size at the last leader decision
    pub static ref APPROVAL_RATIO: Gauge = register_gauge!(
        "cc_consensus_approval_ratio",
        "Approval ratio observed when the leader closed its approval window"
    )
    .expect("Failed to create APPROVAL_RATIO metric");
}

/// Record a finished height
#[cfg(feature = "metrics")]
pub fn record_round_outcome(outcome: &str) {
    ROUNDS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record an accepted peer proof
#[cfg(feature = "metrics")]
pub fn record_proof_received() {
    PROOFS_RECEIVED.inc();
}

/// Record how long a height took
#[cfg(feature = "metrics")]
pub fn record_round_duration(seconds: f64) {
    ROUND_DURATION.observe(seconds);
}

/// Record the approval ratio at the leader's decision
#[cfg(feature = "metrics")]
pub fn record_approval_ratio(ratio: f64) {
    APPROVAL_RATIO.set(ratio);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_round_outcome(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_proof_received() {}

#[cfg(not(feature = "metrics"))]
pub fn record_round_duration(_seconds: f64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_approval_ratio(_ratio: f64) {}
