//! Ports layer for the Mempool subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
