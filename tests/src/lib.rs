//! # CastChain Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs      # Devnet builders, signed payloads
//! │   └── integration/     # Cross-crate flows over the wire handler
//! │       ├── devnet.rs    # Multi-node agreement
//! │       └── flows.rs     # Registry, mempool and catch-up flows
//! └── benches/
//!     └── consensus_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p cc-tests
//!
//! # By category
//! cargo test -p cc-tests integration::devnet
//!
//! # Benchmarks
//! cargo bench -p cc-tests
//! ```

pub mod fixtures;
pub mod integration;
