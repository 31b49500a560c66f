//! # Shared Types Crate
//!
//! Domain entities and boundary types used by every CastChain crate.
//!
//! ## Contents
//!
//! - **Entities**: [`Address`], [`Proof`], [`Block`], [`Transaction`].
//! - **Messages**: the closed [`InboundMessage`] enum every peer payload is
//!   decoded into exactly once.
//! - **Capabilities**: signing/verification and address block-list traits.
//!   Elliptic-curve primitives live behind these.
//! - **Payload guard**: size, depth and collection caps enforced on raw bytes
//!   before any deserialization.
//! - **Time**: the injectable [`TimeSource`].

pub mod capabilities;
pub mod entities;
pub mod errors;
pub mod messages;
pub mod payload;
pub mod time;

pub use capabilities::*;
pub use entities::*;
pub use errors::*;
pub use messages::*;
pub use payload::*;
pub use time::*;
