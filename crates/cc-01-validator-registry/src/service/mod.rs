//! # Registry Service
//!
//! Application service tying the authentication gate to the registry, plus
//! the periodic cleanup and gossip loops.

mod gate;


pub use gate::AuthenticationGate;

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shared_types::{Address, IpReport, TimeSource, ValidatorAdvertisement};
use tokio::sync::watch;

use crate::domain::{
    AuthFailureCause, CleanupContext, IngestError, RegistryError, UpsertOutcome, ValidatorRegistry,
};
use crate::ports::ListGossip;

/// Outcome counts for one advertisement batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
}

pub struct RegistryService {
    registry: Arc<ValidatorRegistry>,
    gate: AuthenticationGate,
    time_source: Arc<dyn TimeSource>,
    /// Set when consensus resolved a fork; the next cleanup pass uses the
    /// fork-choice threshold.
    fork_pending: AtomicBool,
}

impl RegistryService {
    pub fn new(
        registry: Arc<ValidatorRegistry>,
        gate: AuthenticationGate,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            registry,
            gate,
            time_source,
            fork_pending: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<ValidatorRegistry> {
        &self.registry
    }

    /// Authenticate and record a single advertisement.
    pub async fn ingest_advertisement(
        &self,
        adv: &ValidatorAdvertisement,
        source: IpAddr,
    ) -> Result<UpsertOutcome, IngestError> {
        let now = self.time_source.now();
        let verified = self.gate.authenticate(adv, source, now).await?;
        let address = verified.address.clone();
        let outcome = self.registry.upsert(verified, now).inspect_err(|e| {
            tracing::warn!(validator = %address, error = %e, "Verified advertisement not stored");
        })?;
        tracing::debug!(validator = %address, peer_ip = %source, ?outcome, "Validator advertisement accepted");
        Ok(outcome)
    }

    /// Process a validator list (message code `"3"`).
    ///
    /// Entries beyond the broadcast cap are ignored. Processing stops early
    /// once the source gets banned.
    pub async fn ingest_list(&self, list: &[ValidatorAdvertisement], source: IpAddr) -> IngestReport {
        let mut report = IngestReport::default();
        let cap = self.registry.config().max_broadcast_list;
        for adv in list.iter().take(cap) {
            match self.ingest_advertisement(adv, source).await {
                Ok(UpsertOutcome::Inserted) => report.inserted += 1,
                Ok(UpsertOutcome::Updated) => report.updated += 1,
                Err(IngestError::Auth(e)) => {
                    report.rejected += 1;
                    if matches!(e.cause(), AuthFailureCause::Banned) {
                        break;
                    }
                }
                Err(IngestError::Registry(_)) => report.rejected += 1,
            }
        }
        if report.rejected > 0 {
            tracing::info!(
                peer_ip = %source,
                inserted = report.inserted,
                updated = report.updated,
                rejected = report.rejected,
                "Validator list partially rejected"
            );
        }
        report
    }

    /// True if `source` is serving an authentication ban.
    pub fn is_banned(&self, source: IpAddr) -> bool {
        self.gate.tracker().is_banned(source, self.time_source.now())
    }

    /// Outcome of a direct liveness check against a validator. Success marks
    /// it seen and clears its failures; a miss counts one check failure.
    pub fn record_liveness(&self, address: &Address, reachable: bool) -> Result<(), RegistryError> {
        if reachable {
            return self.registry.mark_seen(address, self.time_source.now());
        }
        let failures = self.registry.record_check_failure(address)?;
        tracing::debug!(validator = %address, failures, "Validator failed liveness check");
        Ok(())
    }

    /// A peer confirming the IP it sees for an address (message code `"1"`).
    ///
    /// Only counts when the reported IP matches what we hold; the reporter
    /// becomes a confirming source. `last_seen` is left to direct contact.
    pub fn handle_ip_report(&self, report: &IpReport, source: IpAddr) -> Result<(), RegistryError> {
        let known = self
            .registry
            .ip_of(&report.address)
            .ok_or_else(|| RegistryError::UnknownValidator(report.address.clone()))?;
        match report.ip_address.parse::<IpAddr>() {
            Ok(reported) if reported == known => self.registry.add_confirming_source(&report.address, source),
            _ => {
                tracing::debug!(validator = %report.address, peer_ip = %source, "IP report does not match registry");
                Ok(())
            }
        }
    }

    /// Consensus saw competing blocks for a height.
    pub fn note_fork(&self) {
        self.fork_pending.store(true, Ordering::Release);
    }

    /// One cleanup pass over the registry and the failure tracker.
    pub fn cleanup_once(&self, context: CleanupContext) -> Vec<Address> {
        let now = self.time_source.now();
        let removed = self.registry.cleanup(now, context);
        let pruned = self.gate.tracker().prune(now);
        if !removed.is_empty() || pruned > 0 {
            tracing::info!(
                removed = removed.len(),
                pruned_penalties = pruned,
                remaining = self.registry.len(),
                "Registry cleanup"
            );
        }
        removed
    }

    /// Run cleanup every `interval` until `shutdown` flips to `true`.
    pub async fn run_cleanup_loop(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cleanup_once(self.next_cleanup_context());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Registry cleanup loop stopped");
                        return;
                    }
                }
            }
        }
    }

    fn next_cleanup_context(&self) -> CleanupContext {
        if self.fork_pending.swap(false, Ordering::AcqRel) {
            CleanupContext::ForkChoice
        } else {
            CleanupContext::Standard
        }
    }

    // =========================================================================
    // GOSSIP
    // =========================================================================

    /// Signed advertisements worth relaying, best first. Entries whose
    /// signature is outside the skew window would be refused by the receiver
    /// (and charged to us), so they are left out.
    pub fn gossip_list(&self) -> Vec<ValidatorAdvertisement> {
        let now = self.time_source.now();
        let skew = self.registry.config().max_advertisement_skew_secs;
        self.registry
            .broadcast_list()
            .into_iter()
            .filter(|v| (now - v.signed_at).abs() <= skew)
            .map(|v| v.to_advertisement())
            .collect()
    }

    /// Push the gossip list to every known peer except `local`. Returns how
    /// many peers took it.
    pub async fn gossip_once(&self, gossip: &dyn ListGossip, local: &Address) -> usize {
        let list = self.gossip_list();
        if list.is_empty() {
            return 0;
        }
        let peers = self.registry.peer_ips(Some(local));
        let mut delivered = 0;
        for peer in &peers {
            match gossip.send_list(*peer, &list).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::debug!(peer_ip = %peer, error = %e, "Validator list not delivered"),
            }
        }
        tracing::debug!(entries = list.len(), peers = peers.len(), delivered, "Validator list gossiped");
        delivered
    }

    /// Gossip every `interval` until `shutdown` flips to `true`.
    pub async fn run_gossip_loop(
        self: Arc<Self>,
        gossip: Arc<dyn ListGossip>,
        local: Address,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.gossip_once(gossip.as_ref(), &local).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Registry gossip loop stopped");
                        return;
                    }
                }
            }
        }
    }
}
