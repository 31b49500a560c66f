//! # Subsystem Adapters
//!
//! Newtype bridges that let one subsystem call another through the
//! caller's own port trait.
//!
//! | Bridge | Wraps | Implements |
//! |--------|-------|------------|
//! | [`RegistryBridge`] | `RegistryService` | consensus `ValidatorDirectory` + `RegistryGateway` |
//! | [`MempoolBridge`] | `MempoolService` | consensus `MempoolGateway` |
//! | [`ChainBridge`] | `InMemoryChain` | mempool `ChainLookup` |
//! | [`GossipBridge`] | consensus `Broadcaster` | registry `ListGossip` |

mod chain;
mod gossip;
mod mempool;
mod registry;

pub use chain::ChainBridge;
pub use gossip::GossipBridge;
pub use mempool::MempoolBridge;
pub use registry::RegistryBridge;
