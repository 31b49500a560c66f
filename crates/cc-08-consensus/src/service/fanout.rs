//! Bounded peer fan-out.
//!
//! Every send runs under a timeout with a short retry; outcomes are
//! collected, logged and counted instead of being dropped.

use crate::domain::PeerError;
use crate::ports::{Broadcaster, OutboundMessage};
use cc_telemetry::BROADCAST_OUTCOMES;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

/// Per-peer results of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl FanoutReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed + self.timed_out
    }
}

/// Run `call` under the policy's timeout, retrying with linear backoff.
/// The last error is returned once attempts run out.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut call: F) -> Result<T, PeerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PeerError>>,
{
    let attempts = policy.attempts.max(1);
    let mut last = PeerError::Unavailable("no attempt made".into());
    for attempt in 1..=attempts {
        match tokio::time::timeout(policy.timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e @ PeerError::Rejected(_))) => return Err(e),
            Ok(Err(e)) => last = e,
            Err(_) => last = PeerError::Timeout,
        }
        if attempt < attempts {
            tokio::time::sleep(policy.backoff * attempt).await;
        }
    }
    Err(last)
}

/// Send `message` to every peer, at most `concurrency` at a time.
pub async fn broadcast(
    broadcaster: &dyn Broadcaster,
    peers: Vec<IpAddr>,
    message: &OutboundMessage,
    concurrency: usize,
    policy: RetryPolicy,
) -> FanoutReport {
    let label = message.label();
    let outcomes: Vec<(IpAddr, Result<(), PeerError>)> = stream::iter(peers)
        .map(|peer| async move {
            let result = with_retry(policy, || broadcaster.deliver(peer, message)).await;
            (peer, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = FanoutReport::default();
    for (peer, result) in outcomes {
        let outcome = match result {
            Ok(()) => {
                report.delivered += 1;
                "delivered"
            }
            Err(PeerError::Timeout) => {
                report.timed_out += 1;
                tracing::debug!(peer_ip = %peer, message = label, "Broadcast timed out");
                "timeout"
            }
            Err(e) => {
                report.failed += 1;
                tracing::debug!(peer_ip = %peer, message = label, error = %e, "Broadcast failed");
                "failed"
            }
        };
        BROADCAST_OUTCOMES.with_label_values(&[label, outcome]).inc();
    }
    report
}
