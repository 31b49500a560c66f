//! Adapters layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports, used by the devnet
//! runtime and by tests.

mod directory;
mod in_memory_chain;
mod loopback;

pub use directory::*;
pub use in_memory_chain::*;
pub use loopback::*;
