//! Prometheus metrics for CastChain nodes.
//!
//! All metrics follow the naming convention: `cc_<component>_<metric>_<unit>`
//!
//! Round-level consensus counters live in the consensus crate behind its
//! `metrics` feature; this registry carries node-level state.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CHAIN
    // =========================================================================

    /// Height of the last adopted block
    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "cc_chain_height",
        "Height of the last adopted block"
    ).expect("metric creation failed");

    /// Addresses currently excluded from leader election
    pub static ref EXCLUDED_PRODUCERS: Gauge = Gauge::new(
        "cc_consensus_excluded_producers",
        "Producers excluded from leader election after repeated no-shows"
    ).expect("metric creation failed");

    /// Outbound fan-out results
    pub static ref BROADCAST_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("cc_broadcast_outcomes_total", "Per-peer broadcast results"),
        &["message", "outcome"]  // outcome: delivered/failed/timeout
    ).expect("metric creation failed");

    // =========================================================================
    // MEMPOOL
    // =========================================================================

    /// Current mempool size (transaction count)
    pub static ref MEMPOOL_SIZE: Gauge = Gauge::new(
        "cc_mempool_transactions_pending",
        "Number of pending transactions in mempool"
    ).expect("metric creation failed");

    /// Current mempool size (bytes)
    pub static ref MEMPOOL_BYTES: Gauge = Gauge::new(
        "cc_mempool_size_bytes",
        "Total serialized size of pending transactions"
    ).expect("metric creation failed");

    /// Admission decisions
    pub static ref MEMPOOL_ADMISSIONS: CounterVec = CounterVec::new(
        Opts::new("cc_mempool_admissions_total", "Transaction admission decisions"),
        &["outcome"]  // outcome: admitted/rejected/evicted
    ).expect("metric creation failed");

    // =========================================================================
    // REGISTRY & AUTHENTICATION
    // =========================================================================

    /// Known validators
    pub static ref REGISTRY_SIZE: Gauge = Gauge::new(
        "cc_registry_validators",
        "Validators currently held in the registry"
    ).expect("metric creation failed");

    /// Rejected authentication attempts
    pub static ref AUTH_FAILURES: Counter = Counter::new(
        "cc_auth_failures_total",
        "Authentication attempts rejected by the gate"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling it twice is harmless; already-registered collectors are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CHAIN_HEIGHT.clone()),
        Box::new(EXCLUDED_PRODUCERS.clone()),
        Box::new(BROADCAST_OUTCOMES.clone()),
        Box::new(MEMPOOL_SIZE.clone()),
        Box::new(MEMPOOL_BYTES.clone()),
        Box::new(MEMPOOL_ADMISSIONS.clone()),
        Box::new(REGISTRY_SIZE.clone()),
        Box::new(AUTH_FAILURES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
