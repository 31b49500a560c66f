//! Registry adapter for consensus.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use cc_01_validator_registry::RegistryService;
use cc_08_consensus::{RegistryGateway, ValidatorDirectory};
use shared_types::{Address, IpReport, ValidatorAdvertisement};

/// Exposes the validator registry as the consensus directory and as the
/// target of registry-bound inbound messages.
pub struct RegistryBridge {
    service: Arc<RegistryService>,
    local: Address,
}

impl RegistryBridge {
    pub fn new(service: Arc<RegistryService>, local: Address) -> Self {
        Self { service, local }
    }
}

impl ValidatorDirectory for RegistryBridge {
    fn casting_set(&self) -> Vec<Address> {
        self.service
            .registry()
            .casting_set()
            .into_iter()
            .filter(|address| *address != self.local)
            .collect()
    }

    fn ip_of(&self, address: &Address) -> Option<IpAddr> {
        self.service.registry().ip_of(address)
    }

    fn public_key_of(&self, address: &Address) -> Option<String> {
        self.service.registry().get(address).map(|v| v.public_key)
    }

    fn peer_ips(&self) -> Vec<IpAddr> {
        self.service.registry().peer_ips(Some(&self.local))
    }

    fn record_liveness(&self, address: &Address, reachable: bool) {
        if let Err(e) = self.service.record_liveness(address, reachable) {
            tracing::trace!(%address, reachable, error = %e, "Liveness not recorded");
        }
    }

    fn note_fork(&self) {
        self.service.note_fork();
    }
}

#[async_trait]
impl RegistryGateway for RegistryBridge {
    fn is_banned(&self, source: IpAddr) -> bool {
        self.service.is_banned(source)
    }

    async fn ingest_list(&self, list: Vec<ValidatorAdvertisement>, source: IpAddr) -> usize {
        self.service.ingest_list(&list, source).await.rejected
    }

    fn ip_report(&self, report: &IpReport, source: IpAddr) -> Result<(), String> {
        self.service
            .handle_ip_report(report, source)
            .map_err(|e| e.to_string())
    }
}
