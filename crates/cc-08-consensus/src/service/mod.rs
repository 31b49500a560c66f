//! Consensus Service - Core business logic
//!
//! # Architecture
//! - One [`RoundState`] per height, driven to completion by [`ConsensusService::run_height`]
//! - Every peer call is bounded by a timeout; failures are logged and skipped
//! - A supervisor ([`ConsensusService::run`]) restarts the next height even
//!   if a height task panics
//!
//! # Inbound authentication
//! Proofs, claims and blocks must come from the registered address of a
//! caster in the directory, carry that caster's registered key and clear the
//! stake floor. Blocks are unsigned, so the producer is bound to the source
//! of the message instead and its proof is recomputed from the registered
//! key.
//!
//! # Competing blocks
//! Once the first block for a height arrives the round waits a settle window
//! before committing the canonical candidate. A better block for the tip
//! that arrives after the commit replaces the tip; the round already running
//! on the old tip then fails at commit and the next height starts over.

mod fanout;

#[cfg(test)]
mod tests;

pub use fanout::{broadcast, with_retry, FanoutReport, RetryPolicy};

use crate::domain::{
    check_block, create_proof, election_key, select_winner, verify, BlockTemplate, ConsensusConfig,
    ConsensusError, ConsensusResult, FailedProducerTracker, RoundPhase, RoundState,
    GENESIS_PREV_HASH,
};
use crate::metrics;
use crate::ports::{
    Broadcaster, ChainView, ConsensusApi, MempoolGateway, OutboundMessage, PeerClient,
    ValidatorDirectory,
};
use async_trait::async_trait;
use cc_telemetry::{log_round_event, CHAIN_HEIGHT, EXCLUDED_PRODUCERS};
use parking_lot::RwLock;
use shared_types::{
    Address, Block, Height, Proof, ProofVote, Signer, TimeSource, WinnerClaim,
};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;

/// How a height ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeightOutcome {
    /// We led the height and committed this block.
    Produced(Block),
    /// We adopted a block produced elsewhere.
    Adopted(Block),
    /// We led but too few casters approved.
    QuorumNotReached {
        height: Height,
        approvals: usize,
        casters: usize,
    },
    /// The winner never delivered a block.
    ProducerNoShow {
        height: Height,
        producer: Address,
        strikes: u32,
    },
    /// No eligible proof reached us.
    NoWinner { height: Height },
}

impl HeightOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Produced(_) => "produced",
            Self::Adopted(_) => "adopted",
            Self::QuorumNotReached { .. } => "quorum_not_reached",
            Self::ProducerNoShow { .. } => "producer_no_show",
            Self::NoWinner { .. } => "no_winner",
        }
    }

    /// True if the chain advanced.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Produced(_) | Self::Adopted(_))
    }
}

/// Dependencies for ConsensusService
pub struct ConsensusDependencies {
    pub config: ConsensusConfig,
    pub signer: Arc<dyn Signer>,
    /// Address peers reach us on; stamped into our proofs.
    pub local_ip: IpAddr,
    pub peers: Arc<dyn PeerClient>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub chain: Arc<dyn ChainView>,
    pub directory: Arc<dyn ValidatorDirectory>,
    pub mempool: Arc<dyn MempoolGateway>,
    pub time_source: Arc<dyn TimeSource>,
}

/// Consensus Service
pub struct ConsensusService {
    config: ConsensusConfig,
    signer: Arc<dyn Signer>,
    local_ip: IpAddr,
    peers: Arc<dyn PeerClient>,
    broadcaster: Arc<dyn Broadcaster>,
    chain: Arc<dyn ChainView>,
    directory: Arc<dyn ValidatorDirectory>,
    mempool: Arc<dyn MempoolGateway>,
    time_source: Arc<dyn TimeSource>,
    failed_producers: FailedProducerTracker,
    current: RwLock<Option<Arc<RoundState>>>,
}

impl ConsensusService {
    pub fn new(deps: ConsensusDependencies) -> Self {
        let failed_producers = FailedProducerTracker::new(deps.config.exclusion.clone());
        Self {
            config: deps.config,
            signer: deps.signer,
            local_ip: deps.local_ip,
            peers: deps.peers,
            broadcaster: deps.broadcaster,
            chain: deps.chain,
            directory: deps.directory,
            mempool: deps.mempool,
            time_source: deps.time_source,
            failed_producers,
            current: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn failed_producers(&self) -> &FailedProducerTracker {
        &self.failed_producers
    }

    /// Round in progress, if any.
    pub fn current_round(&self) -> Option<Arc<RoundState>> {
        self.current.read().clone()
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.config.peer_retry_attempts,
            backoff: self.config.peer_retry_backoff(),
            timeout: self.config.peer_call_timeout(),
        }
    }

    /// Casting set plus the local node.
    fn caster_count(&self) -> usize {
        let mut casters: HashSet<Address> = self.directory.casting_set().into_iter().collect();
        casters.insert(self.signer.address());
        casters.len()
    }

    async fn broadcast(&self, message: OutboundMessage) -> FanoutReport {
        let report = broadcast(
            self.broadcaster.as_ref(),
            self.directory.peer_ips(),
            &message,
            self.config.fanout_concurrency,
            self.retry_policy(),
        )
        .await;
        tracing::debug!(
            message = message.label(),
            delivered = report.delivered,
            failed = report.failed,
            timed_out = report.timed_out,
            "Broadcast finished"
        );
        report
    }

    fn publish_exclusions(&self) {
        let excluded = self.failed_producers.exclusion_set(self.time_source.now());
        EXCLUDED_PRODUCERS.set(excluded.len() as f64);
    }

    // =========================================================================
    // HEIGHT DRIVER
    // =========================================================================

    /// Run one height from cadence wait to commit (or give-up).
    pub async fn run_height(&self) -> ConsensusResult<HeightOutcome> {
        if let Some(last) = self.chain.last_block().await {
            let delay = self
                .config
                .cadence()
                .delay(last.height + 1, self.time_source.now());
            tokio::time::sleep(delay).await;
        }

        // The tip may have moved while we waited.
        let (height, prev_hash) = match self.chain.last_block().await {
            Some(tip) => (tip.height + 1, tip.hash),
            None => (self.config.genesis_height, GENESIS_PREV_HASH.to_string()),
        };

        self.failed_producers.prune(self.time_source.now());
        self.publish_exclusions();

        let round = Arc::new(RoundState::new(height, prev_hash, self.time_source.now()));
        round.set_excluded(self.failed_producers.exclusion_set(self.time_source.now()));
        *self.current.write() = Some(round.clone());
        let started = Instant::now();

        let result = self.drive_round(&round).await;

        round.clear();
        {
            let mut current = self.current.write();
            if current.as_ref().is_some_and(|r| Arc::ptr_eq(r, &round)) {
                *current = None;
            }
        }

        metrics::record_round_duration(started.elapsed().as_secs_f64());
        match &result {
            Ok(outcome) => metrics::record_round_outcome(outcome.label()),
            Err(_) => {
                metrics::record_round_outcome("error");
                if round.phase() != RoundPhase::Idle {
                    let _ = round.transition(RoundPhase::Idle);
                }
            }
        }
        result
    }

    async fn drive_round(&self, round: &Arc<RoundState>) -> ConsensusResult<HeightOutcome> {
        let height = round.height();
        let me = self.signer.address();

        round.transition(RoundPhase::ProofGeneration)?;
        let stake = self.chain.stake_of(&me).await;
        if stake >= self.config.min_stake {
            let proof = create_proof(
                me.clone(),
                &self.signer.public_key(),
                height,
                round.previous_hash(),
                self.local_ip,
            );
            round.add_proof(proof.clone())?;
            log_round_event!(debug, "Own proof generated", height, vrf = proof.vrf_number);
            self.broadcast(OutboundMessage::Vote(ProofVote::Proof(proof))).await;
        } else {
            log_round_event!(debug, "Stake below minimum, not casting", height, stake);
        }

        round.transition(RoundPhase::ProofCollection)?;
        if let Some(block) = self.wait_for_block(round, self.config.proof_gossip_window()).await {
            return self.adopt(round, block).await;
        }

        let banned = self.failed_producers.exclusion_set(self.time_source.now());
        let Some(local) = select_winner(&round.proofs(), height, &banned) else {
            log_round_event!(info, "No eligible proof for height", height, proofs = round.proof_count());
            if let Some(block) = self.wait_for_block(round, self.config.block_request_window()).await {
                return self.adopt(round, block).await;
            }
            round.transition(RoundPhase::Idle)?;
            return Ok(HeightOutcome::NoWinner { height });
        };

        let claim = WinnerClaim {
            voter: me.clone(),
            height,
            winner: local.clone(),
        };
        round.record_claim(claim.clone())?;
        self.broadcast(OutboundMessage::Vote(ProofVote::Claim(claim))).await;

        if let Some(block) = self.wait_for_block(round, self.config.proof_collection_time()).await {
            return self.adopt(round, block).await;
        }

        let winner = round.tally(&banned).unwrap_or(local);
        round.declare_winner(winner.clone());
        round.transition(RoundPhase::WinnerSelected)?;
        log_round_event!(
            info,
            "Winner finalized",
            height,
            winner = %winner.address,
            vrf = winner.vrf_number,
            proofs = round.proof_count(),
            claims = round.claim_count()
        );

        if winner.address == me {
            self.lead(round, &winner).await
        } else {
            self.follow(round, &winner).await
        }
    }

    /// Wait up to `window` for a valid block for this round, then let
    /// competitors settle.
    async fn wait_for_block(&self, round: &RoundState, window: std::time::Duration) -> Option<Block> {
        let deadline = Instant::now() + window;
        loop {
            let changed = round.changed();
            if round.canonical_block().is_some() {
                return self.settle(round).await;
            }
            tokio::select! {
                _ = changed => {}
                _ = tokio::time::sleep_until(deadline) => {
                    return match round.canonical_block() {
                        Some(_) => self.settle(round).await,
                        None => None,
                    };
                }
            }
        }
    }

    /// Give competing blocks the settle window to arrive, then pick the
    /// canonical one.
    async fn settle(&self, round: &RoundState) -> Option<Block> {
        tokio::time::sleep(self.config.block_settle_window()).await;
        let candidates = round.candidate_count();
        if candidates > 1 {
            log_round_event!(info, "Competing blocks for height", round.height(), candidates);
            self.directory.note_fork();
        }
        round.canonical_block()
    }

    // =========================================================================
    // LEADER
    // =========================================================================

    async fn lead(&self, round: &RoundState, winner: &Proof) -> ConsensusResult<HeightOutcome> {
        let height = round.height();
        round.transition(RoundPhase::AwaitingApproval)?;

        let casters = self.caster_count();
        let deadline = Instant::now() + self.config.approval_window();
        // The leader backs itself.
        let approvals = loop {
            let changed = round.changed();
            let approvals = round.approval_count() + 1;
            if self.config.quorum_met(approvals, casters) {
                break approvals;
            }
            tokio::select! {
                _ = changed => {}
                _ = tokio::time::sleep_until(deadline) => break round.approval_count() + 1,
            }
        };
        metrics::record_approval_ratio(approvals as f64 / casters as f64);

        if !self.config.quorum_met(approvals, casters) {
            log_round_event!(warn, "Approval quorum not reached", height, approvals, casters);
            round.transition(RoundPhase::Idle)?;
            return Ok(HeightOutcome::QuorumNotReached {
                height,
                approvals,
                casters,
            });
        }

        round.transition(RoundPhase::Finalizing)?;
        let transactions = self
            .mempool
            .select_for_block(self.config.max_block_transactions, self.config.max_block_tx_bytes)
            .await;
        let me = self.signer.address();
        let block = BlockTemplate {
            height,
            prev_hash: round.previous_hash(),
            validator: &me,
            validator_proof: &winner.proof_hash,
            timestamp: self.time_source.now(),
            chain_ref_id: &self.config.chain_ref_id,
        }
        .craft(transactions);

        round.offer_block(block.clone(), winner.clone(), self.local_ip)?;
        if let Some(better) = round.canonical_block().filter(|b| b.hash != block.hash) {
            log_round_event!(
                info,
                "Yielding to better block",
                height,
                hash = %better.hash,
                validator = %better.validator
            );
            return self.adopt(round, better).await;
        }

        round.finalize(block.clone());
        self.commit(&block).await?;
        self.broadcast(OutboundMessage::Block(Box::new(block.clone()))).await;
        log_round_event!(
            info,
            "Block produced",
            height,
            hash = %block.hash,
            txs = block.transactions.len(),
            approvals,
            casters
        );
        round.transition(RoundPhase::Idle)?;
        Ok(HeightOutcome::Produced(block))
    }

    // =========================================================================
    // FOLLOWER
    // =========================================================================

    async fn follow(&self, round: &RoundState, winner: &Proof) -> ConsensusResult<HeightOutcome> {
        let height = round.height();
        let me = self.signer.address();
        let policy = self.retry_policy();
        round.transition(RoundPhase::AwaitingBlock)?;

        let leader_ip = self.directory.ip_of(&winner.address).unwrap_or(winner.ip_address);
        match with_retry(policy, || self.peers.heartbeat(leader_ip)).await {
            Ok(()) => {
                self.directory.record_liveness(&winner.address, true);
                if let Err(e) = with_retry(policy, || self.peers.send_approval(leader_ip, height, &me)).await {
                    tracing::debug!(height, peer_ip = %leader_ip, error = %e, "Approval not delivered");
                }
            }
            Err(e) => {
                self.directory.record_liveness(&winner.address, false);
                tracing::debug!(height, peer_ip = %leader_ip, error = %e, "Leader unreachable, skipping approval");
            }
        }

        let deadline = Instant::now() + self.config.block_request_window();
        loop {
            let changed = round.changed();
            if round.canonical_block().is_some() {
                break;
            }
            if Instant::now() >= deadline {
                break;
            }
            match with_retry(policy, || self.peers.get_block(leader_ip, height)).await {
                Ok(Some(block)) => {
                    if let Err(e) = self.receive_block(round, block, leader_ip).await {
                        tracing::debug!(height, peer_ip = %leader_ip, error = %e, "Fetched block refused");
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::trace!(height, peer_ip = %leader_ip, error = %e, "Block poll failed"),
            }
            tokio::select! {
                _ = changed => {}
                _ = tokio::time::sleep(self.config.block_poll_interval()) => {}
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }
        if round.canonical_block().is_some() {
            if let Some(block) = self.settle(round).await {
                return self.adopt(round, block).await;
            }
        }

        self.directory.record_liveness(&winner.address, false);
        let strikes = self
            .failed_producers
            .record_failure(&winner.address, self.time_source.now());
        self.publish_exclusions();
        log_round_event!(warn, "Producer did not deliver", height, producer = %winner.address, strikes);
        round.transition(RoundPhase::Idle)?;
        Ok(HeightOutcome::ProducerNoShow {
            height,
            producer: winner.address.clone(),
            strikes,
        })
    }

    async fn adopt(&self, round: &RoundState, block: Block) -> ConsensusResult<HeightOutcome> {
        round.transition(RoundPhase::Adopting)?;
        round.finalize(block.clone());
        self.commit(&block).await?;
        log_round_event!(info, "Block adopted", block.height, hash = %block.hash, validator = %block.validator);
        round.transition(RoundPhase::Idle)?;
        Ok(HeightOutcome::Adopted(block))
    }

    /// Append to the chain and drop the included transactions from the pool.
    async fn commit(&self, block: &Block) -> ConsensusResult<()> {
        self.chain
            .adopt_block(block.clone())
            .await
            .map_err(ConsensusError::Chain)?;
        if !block.transactions.is_empty() {
            self.mempool.remove_included(&block.transactions).await;
        }
        self.failed_producers.record_success(&block.validator);
        if block.validator != self.signer.address() {
            self.directory.record_liveness(&block.validator, true);
        }
        CHAIN_HEIGHT.set(block.height as f64);
        Ok(())
    }

    // =========================================================================
    // INBOUND CHECKS
    // =========================================================================

    /// Registered key of a caster, the local node included.
    fn caster_key(&self, address: &Address) -> Option<String> {
        if *address == self.signer.address() {
            return Some(self.signer.public_key());
        }
        if !self.directory.casting_set().contains(address) {
            return None;
        }
        self.directory.public_key_of(address)
    }

    /// `source` must be the address registered for `address`.
    fn check_source(&self, address: &Address, source: IpAddr) -> ConsensusResult<()> {
        let registered = if *address == self.signer.address() {
            Some(self.local_ip)
        } else {
            self.directory.ip_of(address)
        };
        if registered != Some(source) {
            return Err(ConsensusError::SourceMismatch {
                address: address.clone(),
                peer_ip: source,
            });
        }
        Ok(())
    }

    async fn check_stake(&self, address: &Address) -> ConsensusResult<()> {
        let stake = self.chain.stake_of(address).await;
        if stake < self.config.min_stake {
            return Err(ConsensusError::InsufficientStake {
                address: address.clone(),
                stake,
            });
        }
        Ok(())
    }

    /// A proof must name a registered caster, carry its key and clear the
    /// stake floor.
    async fn check_caster_proof(&self, proof: &Proof) -> ConsensusResult<()> {
        let key = self
            .caster_key(&proof.address)
            .ok_or_else(|| ConsensusError::UnknownCaster(proof.address.clone()))?;
        if proof.public_key != key {
            return Err(ConsensusError::KeyMismatch(proof.address.clone()));
        }
        self.check_stake(&proof.address).await
    }

    /// Authenticate a block's producer and rebuild the proof that entitles
    /// it.
    async fn check_producer(&self, block: &Block, source: IpAddr) -> ConsensusResult<Proof> {
        let key = self
            .caster_key(&block.validator)
            .ok_or_else(|| ConsensusError::UnknownCaster(block.validator.clone()))?;
        self.check_source(&block.validator, source)?;
        let wrong_producer = || ConsensusError::WrongProducer {
            height: block.height,
            validator: block.validator.clone(),
        };
        let excluded = self.failed_producers.exclusion_set(self.time_source.now());
        if excluded.contains(&block.validator) {
            return Err(wrong_producer());
        }
        if !verify(&key, block.height, &block.prev_hash, &block.validator_proof) {
            return Err(wrong_producer());
        }
        self.check_stake(&block.validator).await?;
        Ok(create_proof(
            block.validator.clone(),
            &key,
            block.height,
            &block.prev_hash,
            source,
        ))
    }

    async fn check_contents(&self, block: &Block) -> ConsensusResult<()> {
        self.mempool
            .validate_block_transactions(block)
            .await
            .map_err(ConsensusError::InvalidBlockContents)
    }

    /// Authenticate a block for the running round and add it to the
    /// candidates.
    async fn receive_block(&self, round: &RoundState, block: Block, source: IpAddr) -> ConsensusResult<()> {
        check_block(&block, round.height(), round.previous_hash())?;
        let producer = self.check_producer(&block, source).await?;
        self.check_contents(&block).await?;
        round.offer_block(block, producer, source)
    }

    // =========================================================================
    // SUPERVISOR
    // =========================================================================

    /// Run heights back to back until `shutdown` flips to `true`.
    ///
    /// Each height runs in its own task; an error or panic is logged and the
    /// next height starts.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(address = %self.signer.address(), "Consensus loop started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let service = Arc::clone(&self);
            let mut task = tokio::spawn(async move { service.run_height().await });

            let joined = loop {
                tokio::select! {
                    joined = &mut task => break Some(joined),
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            task.abort();
                            break None;
                        }
                    }
                }
            };
            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok(Ok(outcome)) => {
                    tracing::debug!(outcome = outcome.label(), "Height finished");
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, kind = e.kind().as_str(), "Height failed");
                    tokio::time::sleep(self.config.block_poll_interval()).await;
                }
                Err(e) if e.is_panic() => {
                    tracing::error!(error = %e, "Height task panicked; starting next height");
                    *self.current.write() = None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Height task cancelled");
                }
            }
        }
        tracing::info!("Consensus loop stopped");
    }

    /// Handle a block while no round for its height is running: adopt it
    /// if it extends the tip, or swap it in if it beats the tip.
    async fn catch_up(&self, block: Block, source: IpAddr) -> ConsensusResult<()> {
        let tip = self.chain.last_block().await;
        let (height, prev_hash) = match &tip {
            Some(tip) if block.height == tip.height && block.hash != tip.hash => {
                return self.challenge_tip(tip, block, source).await;
            }
            Some(tip) => (tip.height + 1, tip.hash.clone()),
            None => (self.config.genesis_height, GENESIS_PREV_HASH.to_string()),
        };
        check_block(&block, height, &prev_hash)?;
        self.check_producer(&block, source).await?;
        self.check_contents(&block).await?;
        self.commit(&block).await?;
        tracing::info!(height, hash = %block.hash, peer_ip = %source, "Caught up with peer block");
        Ok(())
    }

    /// Replace the tip with a same-height block from a better-ranked
    /// producer, or from the same producer with a smaller hash.
    async fn challenge_tip(&self, tip: &Block, block: Block, source: IpAddr) -> ConsensusResult<()> {
        check_block(&block, tip.height, &tip.prev_hash)?;
        let producer = self.check_producer(&block, source).await?;

        // An incumbent whose producer we cannot rank always loses.
        let incumbent = self.caster_key(&tip.validator).map(|key| {
            let ip = self.directory.ip_of(&tip.validator).unwrap_or(self.local_ip);
            create_proof(tip.validator.clone(), &key, tip.height, &tip.prev_hash, ip)
        });
        if let Some(incumbent) = &incumbent {
            if (election_key(incumbent), tip.hash.as_str()) <= (election_key(&producer), block.hash.as_str()) {
                return Err(ConsensusError::WrongHeight {
                    expected: tip.height + 1,
                    actual: block.height,
                });
            }
        }
        self.check_contents(&block).await?;

        let displaced = self
            .chain
            .replace_tip(block.clone())
            .await
            .map_err(ConsensusError::Chain)?;
        for tx in displaced.transactions {
            if block.transactions.iter().any(|t| t.hash == tx.hash) {
                continue;
            }
            let hash = tx.hash.clone();
            if let Err(e) = self.mempool.submit(tx).await {
                tracing::debug!(tx_hash = %hash, error = %e, "Displaced transaction not resubmitted");
            }
        }
        if !block.transactions.is_empty() {
            self.mempool.remove_included(&block.transactions).await;
        }
        self.failed_producers.record_success(&block.validator);
        self.directory.record_liveness(&block.validator, true);
        self.directory.note_fork();
        log_round_event!(
            warn,
            "Tip replaced by better block",
            block.height,
            hash = %block.hash,
            displaced = %displaced.hash,
            validator = %block.validator,
            peer_ip = %source
        );
        Ok(())
    }
}

#[async_trait]
impl ConsensusApi for ConsensusService {
    async fn accept_proof(&self, proof: Proof, source: IpAddr) -> ConsensusResult<bool> {
        let round = self.current_round().ok_or(ConsensusError::NoActiveRound)?;
        self.check_caster_proof(&proof).await?;
        self.check_source(&proof.address, source)?;
        let added = round.add_proof(proof)?;
        if added {
            metrics::record_proof_received();
        }
        Ok(added)
    }

    async fn accept_claim(&self, claim: WinnerClaim, source: IpAddr) -> ConsensusResult<bool> {
        let round = self.current_round().ok_or(ConsensusError::NoActiveRound)?;
        if self.caster_key(&claim.voter).is_none() {
            return Err(ConsensusError::UnknownCaster(claim.voter));
        }
        self.check_source(&claim.voter, source)?;
        self.check_caster_proof(&claim.winner).await?;
        round.record_claim(claim)
    }

    fn accept_approval(&self, height: Height, approver: Address, source: IpAddr) -> ConsensusResult<bool> {
        let round = self.current_round().ok_or(ConsensusError::NoActiveRound)?;
        let known = self.directory.casting_set().contains(&approver)
            && self.directory.ip_of(&approver) == Some(source);
        if !known {
            return Err(ConsensusError::UnknownApprover(approver));
        }
        let recorded = round.record_approval(height, source, approver.clone())?;
        self.directory.record_liveness(&approver, true);
        Ok(recorded)
    }

    async fn accept_block(&self, block: Block, source: IpAddr) -> ConsensusResult<()> {
        if let Some(round) = self.current_round() {
            if block.height == round.height() {
                return self.receive_block(&round, block, source).await;
            }
        }
        self.catch_up(block, source).await
    }

    async fn block_at(&self, height: Height) -> Option<Block> {
        if let Some(block) = self.chain.block_at(height).await {
            return Some(block);
        }
        self.current_round()
            .and_then(|round| round.finalized_block().filter(|b| b.height == height).cloned())
    }

    fn current_height(&self) -> Option<Height> {
        self.current_round().map(|round| round.height())
    }

    fn excluded_producers(&self) -> Vec<Address> {
        let mut excluded: Vec<Address> = self
            .failed_producers
            .exclusion_set(self.time_source.now())
            .into_iter()
            .collect();
        excluded.sort();
        excluded
    }
}
