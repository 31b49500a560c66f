//! Adapters layer.

pub mod secp256k1;

pub use secp256k1::{keccak256, Secp256k1Signer, Secp256k1Verifier};
