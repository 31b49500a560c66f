//! # Capabilities
//!
//! Traits standing in for the elliptic-curve primitives and the address
//! block-list. Concrete implementations live in the registry crate (k256)
//! and in test doubles.

use crate::entities::Address;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Signature verification and address derivation.
pub trait SignatureVerifier: Send + Sync {
    /// True if `signature` over `message` was produced by the key behind
    /// `address`. Malformed inputs return `false`, never panic.
    fn verify(&self, address: &Address, message: &[u8], signature: &str) -> bool;

    /// Derive the address a public key controls, if the key parses.
    fn derive_address(&self, public_key: &str) -> Option<Address>;
}

/// The local node's signing identity.
pub trait Signer: Send + Sync {
    /// Sign `message`; `None` only if the backend rejects the input.
    fn sign(&self, message: &[u8]) -> Option<String>;
    fn address(&self) -> Address;
    fn public_key(&self) -> String;
}

/// Address block-list (ABL).
pub trait AddressBlockList: Send + Sync {
    fn is_blocked(&self, address: &Address) -> bool;
}

/// Block-list held in memory, replaced wholesale or edited in place.
#[derive(Debug, Default)]
pub struct InMemoryBlockList {
    blocked: RwLock<HashSet<Address>>,
}

impl InMemoryBlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_addresses(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self {
            blocked: RwLock::new(addresses.into_iter().collect()),
        }
    }

    pub fn block(&self, address: Address) {
        self.blocked.write().insert(address);
    }

    pub fn unblock(&self, address: &Address) {
        self.blocked.write().remove(address);
    }

    pub fn len(&self) -> usize {
        self.blocked.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.read().is_empty()
    }
}

impl AddressBlockList for InMemoryBlockList {
    fn is_blocked(&self, address: &Address) -> bool {
        self.blocked.read().contains(address)
    }
}
