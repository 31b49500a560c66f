//! Proof codec
//!
//! A proof binds a validator's public key to the chain tip it builds on:
//!
//! ```text
//! seed        = public_key || height || previous_block_hash
//! vrf_number  = i32(SHA256(seed)[0..4]) & 0x7FFF_FFFF
//! proof_hash  = base64(SHA256(seed || vrf_number))
//! ```
//!
//! Anyone holding the three inputs recomputes both values, so verification
//! needs no signature.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use shared_types::{Address, Height, Proof};
use std::net::IpAddr;

/// Output of [`generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOutput {
    pub vrf_number: u32,
    pub proof_hash: String,
}

fn seed(public_key: &str, height: Height, prev_hash: &str) -> Vec<u8> {
    let height = height.to_string();
    let mut seed = Vec::with_capacity(public_key.len() + height.len() + prev_hash.len());
    seed.extend_from_slice(public_key.as_bytes());
    seed.extend_from_slice(height.as_bytes());
    seed.extend_from_slice(prev_hash.as_bytes());
    seed
}

/// Derive the VRF number and proof hash for a key at a height.
pub fn generate(public_key: &str, height: Height, prev_hash: &str) -> ProofOutput {
    let seed = seed(public_key, height, prev_hash);
    let digest = Sha256::digest(&seed);

    let mut head = [0u8; 4];
    head.copy_from_slice(&digest[..4]);
    // Masking the sign bit keeps the value in 0..=i32::MAX.
    let vrf_number = (i32::from_le_bytes(head) & 0x7FFF_FFFF) as u32;

    let mut hasher = Sha256::new();
    hasher.update(&seed);
    hasher.update(vrf_number.to_string().as_bytes());
    let proof_hash = BASE64_STANDARD.encode(hasher.finalize());

    ProofOutput {
        vrf_number,
        proof_hash,
    }
}

/// True if `claimed_proof_hash` is what `generate` yields for the inputs.
pub fn verify(public_key: &str, height: Height, prev_hash: &str, claimed_proof_hash: &str) -> bool {
    generate(public_key, height, prev_hash).proof_hash == claimed_proof_hash
}

/// Verify both derived fields of a received proof.
pub fn verify_proof(proof: &Proof) -> bool {
    let expected = generate(&proof.public_key, proof.block_height, &proof.previous_block_hash);
    expected.proof_hash == proof.proof_hash && expected.vrf_number == proof.vrf_number
}

/// Build the local node's proof for a height.
pub fn create_proof(
    address: Address,
    public_key: &str,
    height: Height,
    prev_hash: &str,
    ip_address: IpAddr,
) -> Proof {
    let ProofOutput {
        vrf_number,
        proof_hash,
    } = generate(public_key, height, prev_hash);
    Proof {
        address,
        public_key: public_key.to_string(),
        block_height: height,
        previous_block_hash: prev_hash.to_string(),
        proof_hash,
        vrf_number,
        ip_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const KEY: &str = "02a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(generate(KEY, 10, "abc"), generate(KEY, 10, "abc"));
    }

    #[test]
    fn test_vrf_number_is_31_bit() {
        for height in 0..200 {
            assert!(generate(KEY, height, "prev").vrf_number <= i32::MAX as u32);
        }
    }

    #[test]
    fn test_inputs_change_output() {
        let base = generate(KEY, 10, "abc");
        assert_ne!(base, generate(KEY, 11, "abc"));
        assert_ne!(base, generate(KEY, 10, "abd"));
        assert_ne!(base, generate("03ff", 10, "abc"));
    }

    #[test]
    fn test_verify_round_trip_and_tamper() {
        let out = generate(KEY, 7, "tip");
        assert!(verify(KEY, 7, "tip", &out.proof_hash));
        assert!(!verify(KEY, 8, "tip", &out.proof_hash));
        assert!(!verify(KEY, 7, "tip", "not-a-proof"));
        assert!(!verify(KEY, 7, "tip", ""));
    }

    #[test]
    fn test_verify_proof_checks_vrf_number() {
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let mut proof = create_proof(Address::from("0xabc"), KEY, 3, "tip", ip);
        assert!(verify_proof(&proof));

        proof.vrf_number = proof.vrf_number.wrapping_add(1);
        assert!(!verify_proof(&proof));
    }

    #[test]
    fn test_proof_hash_is_base64_of_sha256() {
        let out = generate(KEY, 1, "x");
        let raw = BASE64_STANDARD.decode(&out.proof_hash).unwrap();
        assert_eq!(raw.len(), 32);
    }
}
