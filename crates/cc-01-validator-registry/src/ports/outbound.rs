//! Driven ports (Outbound dependencies)

use async_trait::async_trait;
use shared_types::{Address, ValidatorAdvertisement};
use std::net::IpAddr;

/// Account state lookup used as the last authentication step.
///
/// Implementations typically hit chain state or a remote index, so the gate
/// only calls it once every cheaper check has passed.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// True if `address` is allowed to operate as a validator.
    async fn is_known_account(&self, address: &Address) -> bool;
}

/// Accepts every address. For single-node and test setups.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveAccountLookup;

#[async_trait]
impl AccountLookup for PermissiveAccountLookup {
    async fn is_known_account(&self, _address: &Address) -> bool {
        true
    }
}

/// Transport for pushing the local validator list to a peer (message code
/// `"3"`).
#[async_trait]
pub trait ListGossip: Send + Sync {
    async fn send_list(&self, peer: IpAddr, list: &[ValidatorAdvertisement]) -> Result<(), String>;
}
