//! Domain layer for the validator registry.

pub mod entities;
pub mod errors;
pub mod penalty;
pub mod registry;

pub use entities::*;
pub use errors::*;
pub use penalty::*;
pub use registry::*;
