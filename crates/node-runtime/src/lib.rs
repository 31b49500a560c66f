//! # Node Runtime Library
//!
//! This library exposes the internals of the node runtime for testing.
//! The main entry point is the `main.rs` binary.
//!
//! - `container/` - configuration and subsystem wiring
//! - `adapters/` - bridges between subsystem ports
//! - `runtime` - long-lived tasks and shutdown

pub mod adapters;
pub mod container;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, SubsystemContainer};
pub use runtime::NodeRuntime;
