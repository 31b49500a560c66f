//! # Test Fixtures
//!
//! Builders for in-process devnets. Every node is a fully wired
//! [`SubsystemContainer`] attached to one [`LoopbackNetwork`], and every
//! payload goes through the same wire handler a remote peer would hit.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use cc_01_validator_registry::Secp256k1Signer;
use cc_08_consensus::{ConsensusConfig, LoopbackNetwork};
use node_runtime::{NodeConfig, SubsystemContainer};
use shared_types::{
    Address, FixedTimeSource, Signer, Timestamp, Transaction, TransactionKind,
    ValidatorAdvertisement,
};

pub const NOW: Timestamp = 1_700_000_000;

/// Wire codes used by the fixtures.
pub mod code {
    pub const IP_REPORT: &str = "1";
    pub const VALIDATOR_LIST: &str = "3";
    pub const FAILED_PRODUCER: &str = "4";
    pub const CONFIRMED_BLOCK: &str = "7";
    pub const TRANSACTION: &str = "7777";
}

pub fn node_ip(index: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, index + 1))
}

/// An IP no validator uses, standing in for a wallet or relay.
pub fn client_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 50, 5))
}

/// Deterministic 32-byte secret for node `index`.
pub fn secret(index: u8) -> String {
    format!("{:064x}", u64::from(index) + 1)
}

pub struct DevnetNode {
    pub container: SubsystemContainer,
    pub signer: Secp256k1Signer,
    pub ip: IpAddr,
}

impl DevnetNode {
    pub fn address(&self) -> Address {
        self.container.address.clone()
    }

    /// Feed a raw payload to this node's wire handler.
    pub async fn deliver(
        &self,
        code: &str,
        payload: &[u8],
        source: IpAddr,
    ) -> Result<(), cc_08_consensus::ConsensusError> {
        self.container.inbound.handle_raw(code, payload, source).await
    }
}

pub struct Devnet {
    pub network: Arc<LoopbackNetwork>,
    pub clock: Arc<FixedTimeSource>,
    pub nodes: Vec<DevnetNode>,
}

impl Devnet {
    /// `size` nodes with short consensus timers.
    pub fn new(size: u8) -> Self {
        Self::with_config(size, |_| {})
    }

    pub fn with_config(size: u8, tweak: impl Fn(&mut NodeConfig)) -> Self {
        let network = LoopbackNetwork::new();
        let clock = Arc::new(FixedTimeSource::new(NOW));
        let nodes = (0..size)
            .map(|index| {
                let mut config = NodeConfig {
                    consensus: ConsensusConfig::for_testing(),
                    ..NodeConfig::default()
                };
                config.node.secret_key = Some(secret(index));
                config.node.public_ip = node_ip(index);
                tweak(&mut config);

                let container = SubsystemContainer::attach(config, clock.clone(), network.clone())
                    .expect("devnet node wires");
                let signer = Secp256k1Signer::from_secret_hex(&secret(index)).expect("valid secret");
                DevnetNode {
                    container,
                    signer,
                    ip: node_ip(index),
                }
            })
            .collect();
        Self {
            network,
            clock,
            nodes,
        }
    }

    /// Every node hears every node's signed advertisement, relayed by its
    /// neighbour.
    pub async fn introduce(&self) {
        let list: Vec<ValidatorAdvertisement> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| advertisement(&node.signer, node.ip, &format!("node-{}", i)))
            .collect();
        let payload = serde_json::to_vec(&list).expect("list encodes");
        for (i, node) in self.nodes.iter().enumerate() {
            let relay = self.nodes[(i + 1) % self.nodes.len()].ip;
            node.deliver(code::VALIDATOR_LIST, &payload, relay)
                .await
                .expect("validator list accepted");
        }
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.nodes.iter().map(DevnetNode::address).collect()
    }
}

/// A correctly signed self-advertisement.
pub fn advertisement(signer: &Secp256k1Signer, ip: IpAddr, name: &str) -> ValidatorAdvertisement {
    let address = signer.address().as_str().to_string();
    let ip_address = ip.to_string();
    let nonce = "1".to_string();
    let signature_message =
        ValidatorAdvertisement::canonical_message(&address, &ip_address, name, &nonce, NOW);
    let signature = signer
        .sign(signature_message.as_bytes())
        .expect("secp256k1 signs");
    ValidatorAdvertisement {
        address,
        ip_address,
        public_key: signer.public_key(),
        signature,
        signature_message,
        unique_name: name.to_string(),
        nonce,
        timestamp: NOW,
    }
}

/// A correctly signed transfer from `sender`.
pub fn signed_transfer(sender: &Secp256k1Signer, nonce: u64, amount: u64) -> Transaction {
    let mut tx = Transaction {
        hash: String::new(),
        from_address: sender.address(),
        to_address: Address::from("0x000000000000000000000000000000000000beef"),
        amount,
        fee: 100,
        nonce,
        timestamp: NOW,
        kind: TransactionKind::Transfer,
        public_key: sender.public_key(),
        signature: String::new(),
        payload: String::new(),
    };
    tx.signature = sender
        .sign(tx.signing_message().as_bytes())
        .expect("secp256k1 signs");
    tx.hash = tx.compute_hash();
    tx
}
