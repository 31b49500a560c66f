//! Validator-list transport for the registry.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use cc_01_validator_registry::ListGossip;
use cc_08_consensus::{Broadcaster, OutboundMessage};
use shared_types::ValidatorAdvertisement;

/// Sends the registry's gossip list over the consensus broadcaster as a
/// code `"3"` message.
pub struct GossipBridge {
    broadcaster: Arc<dyn Broadcaster>,
}

impl GossipBridge {
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { broadcaster }
    }
}

#[async_trait]
impl ListGossip for GossipBridge {
    async fn send_list(&self, peer: IpAddr, list: &[ValidatorAdvertisement]) -> Result<(), String> {
        self.broadcaster
            .deliver(peer, &OutboundMessage::ValidatorList(list.to_vec()))
            .await
            .map_err(|e| e.to_string())
    }
}
