//! # secp256k1 Signing Adapter
//!
//! Implements the shared signing capabilities with k256.
//!
//! ## Formats
//!
//! - Address: `0x` + hex of the last 20 bytes of `keccak256(pubkey[1..])`
//!   over the uncompressed SEC1 point
//! - Public key: hex SEC1, compressed or uncompressed
//! - Signature: hex `r || s || v`, 65 bytes, over `keccak256(message)`
//!
//! Verification recovers the key from the signature and compares the derived
//! address, so a signature can only match one address.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use shared_types::{Address, SignatureVerifier, Signer};

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the address controlled by a verifying key.
pub fn address_from_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point prefix.
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::new(format!("0x{}", hex::encode(&hash[12..])))
}

// =============================================================================
// VERIFIER
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self
    }

    fn recover(message: &[u8], signature: &str) -> Option<Address> {
        let bytes = hex::decode(signature.strip_prefix("0x").unwrap_or(signature)).ok()?;
        if bytes.len() != 65 {
            return None;
        }
        let sig = Signature::from_slice(&bytes[..64]).ok()?;
        // Accept both raw (0/1) and Ethereum-style (27/28) recovery ids.
        let v = match bytes[64] {
            27 | 28 => bytes[64] - 27,
            v => v,
        };
        let recovery_id = RecoveryId::from_byte(v)?;
        let key = VerifyingKey::recover_from_prehash(&keccak256(message), &sig, recovery_id).ok()?;
        Some(address_from_key(&key))
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, address: &Address, message: &[u8], signature: &str) -> bool {
        match Self::recover(message, signature) {
            Some(recovered) => recovered.as_str().eq_ignore_ascii_case(address.as_str()),
            None => false,
        }
    }

    fn derive_address(&self, public_key: &str) -> Option<Address> {
        let bytes = hex::decode(public_key.strip_prefix("0x").unwrap_or(public_key)).ok()?;
        let key = VerifyingKey::from_sec1_bytes(&bytes).ok()?;
        Some(address_from_key(&key))
    }
}

// =============================================================================
// SIGNER
// =============================================================================

/// The node's own secp256k1 identity.
#[derive(Clone)]
pub struct Secp256k1Signer {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for Secp256k1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Secp256k1Signer {
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Load from a hex-encoded 32-byte secret.
    pub fn from_secret_hex(secret: &str) -> Option<Self> {
        let bytes = hex::decode(secret.strip_prefix("0x").unwrap_or(secret)).ok()?;
        SigningKey::from_slice(&bytes).ok().map(Self::from_key)
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_from_key(key.verifying_key());
        Self { key, address }
    }
}

impl Signer for Secp256k1Signer {
    fn sign(&self, message: &[u8]) -> Option<String> {
        let (sig, recovery_id) = self.key.sign_prehash_recoverable(&keccak256(message)).ok()?;
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte());
        Some(hex::encode(bytes))
    }

    fn address(&self) -> Address {
        self.address.clone()
    }

    fn public_key(&self) -> String {
        hex::encode(self.key.verifying_key().to_encoded_point(true).as_bytes())
    }
}
