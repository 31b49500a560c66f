//! # Subsystem Container
//!
//! Central container holding all subsystem instances with proper lifetime
//! management and dependency injection.
//!
//! Construction order follows the dependency chain: registry, then mempool
//! (needs the chain), then consensus (needs all of them).

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, IdentityConfig, NetworkConfig, NodeConfig};
pub use subsystems::SubsystemContainer;
