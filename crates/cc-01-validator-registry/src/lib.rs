//! # Validator Registry
//!
//! Tracks the validators a node knows about and authenticates every
//! advertisement before it reaches the table.
//!
//! ## Architecture
//!
//! - **Domain**: [`ValidatorRegistry`] (concurrent table), per-IP
//!   [`AuthFailureTracker`], entities and errors
//! - **Ports**: [`AccountLookup`], the expensive account check, and
//!   [`ListGossip`], the transport for validator list pushes
//! - **Adapters**: secp256k1 signer/verifier (k256)
//! - **Service**: [`AuthenticationGate`], [`RegistryService`] and the
//!   periodic cleanup and gossip loops
//!
//! ## Authentication order
//!
//! Banned sources are dropped first, then field caps, then signature
//! verification, then the address block-list, then the account lookup.
//! A forged advertisement never costs a state lookup.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{Secp256k1Signer, Secp256k1Verifier};
pub use domain::*;
pub use ports::*;
pub use service::{AuthenticationGate, IngestReport, RegistryService};
