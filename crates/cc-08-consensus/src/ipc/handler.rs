//! Inbound message handler
//!
//! Every message a peer pushes arrives here as `(code, payload, source)`.
//! Checks run cheapest first:
//! 1. Banned source: dropped before the payload is touched
//! 2. Code and payload decoded once into [`InboundMessage`] under the size,
//!    depth and collection caps
//! 3. Exhaustive dispatch to consensus, registry or mempool

use crate::domain::ConsensusError;
use crate::ports::{ConsensusApi, MempoolGateway, RegistryGateway};
use shared_types::{InboundMessage, PayloadLimits, ProofVote};
use std::net::IpAddr;
use std::sync::Arc;

pub struct InboundHandler<S: ConsensusApi> {
    service: Arc<S>,
    registry: Arc<dyn RegistryGateway>,
    mempool: Arc<dyn MempoolGateway>,
    limits: PayloadLimits,
}

impl<S: ConsensusApi> InboundHandler<S> {
    pub fn new(
        service: Arc<S>,
        registry: Arc<dyn RegistryGateway>,
        mempool: Arc<dyn MempoolGateway>,
        limits: PayloadLimits,
    ) -> Self {
        Self {
            service,
            registry,
            mempool,
            limits,
        }
    }

    /// Decode and handle a raw message. Failures are logged here with their
    /// kind and returned so the transport can answer the peer.
    pub async fn handle_raw(&self, code: &str, payload: &[u8], source: IpAddr) -> Result<(), ConsensusError> {
        if self.registry.is_banned(source) {
            tracing::debug!(peer_ip = %source, "Dropped message from banned source");
            return Err(ConsensusError::SourceBanned(source));
        }

        let result = match InboundMessage::decode(code, payload, &self.limits) {
            Ok(message) => self.handle(message, source).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            let code: String = code.chars().take(16).collect();
            tracing::debug!(
                peer_ip = %source,
                code = %code,
                kind = e.kind().as_str(),
                error = %e,
                "Inbound message refused"
            );
        }
        result
    }

    /// Route one decoded message.
    pub async fn handle(&self, message: InboundMessage, source: IpAddr) -> Result<(), ConsensusError> {
        match message {
            InboundMessage::IpReport(report) => self
                .registry
                .ip_report(&report, source)
                .map_err(ConsensusError::Registry),
            InboundMessage::ProofVote(ProofVote::Proof(proof)) => {
                self.service.accept_proof(proof, source).await.map(|_| ())
            }
            InboundMessage::ProofVote(ProofVote::Claim(claim)) => {
                self.service.accept_claim(claim, source).await.map(|_| ())
            }
            InboundMessage::ValidatorList(list) => {
                let offered = list.len();
                let rejected = self.registry.ingest_list(list, source).await;
                if rejected > 0 {
                    tracing::debug!(peer_ip = %source, offered, rejected, "Validator list partially rejected");
                }
                Ok(())
            }
            InboundMessage::FailedProducerReport(report) => {
                // Advisory only: exclusion follows our own observations.
                tracing::info!(
                    peer_ip = %source,
                    reporter = %report.reporter,
                    producer = %report.producer,
                    height = report.height,
                    "Peer reported failed producer"
                );
                Ok(())
            }
            InboundMessage::ConfirmedBlock(block) => self.service.accept_block(*block, source).await,
            InboundMessage::Transaction(tx) => self
                .mempool
                .submit(*tx)
                .await
                .map_err(ConsensusError::Mempool),
            InboundMessage::FailureNotice(notice) => {
                tracing::warn!(
                    peer_ip = %source,
                    reason = %notice.reason,
                    "Peer sent failure notice"
                );
                Ok(())
            }
        }
    }
}
