//! # cc-08-consensus
//!
//! Consensus subsystem for CastChain.
//!
//! ## Architecture
//!
//! Every casting validator runs the same per-height protocol. Leader
//! election needs no coordinator: each node derives the same winner from the
//! same proofs.
//!
//! ```text
//! cadence delay
//!     │
//!     ▼
//! ProofGeneration ──proof──→ [peers]
//!     │
//!     ▼
//! ProofCollection ──claim──→ [peers]      (lowest VRF wins locally)
//!     │
//!     ▼
//! WinnerSelected                          (claims tallied, majority wins)
//!     ├── leader:   AwaitingApproval → Finalizing ──block──→ [peers]
//!     └── follower: AwaitingBlock    → Adopting
//! ```
//!
//! A producer that wins and never delivers is struck; three strikes inside
//! the decay window exclude it from elections for an hour.
//!
//! Proofs, claims and blocks are only taken from casters in the directory,
//! from their registered address, with their registered key. Competing
//! blocks for one height go to the best-ranked producer, then the smallest
//! hash; a settle window after the first block lets competitors arrive, and
//! a better block that arrives after the commit replaces the tip.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cc_08_consensus::{ConsensusDependencies, ConsensusService};
//!
//! let service = Arc::new(ConsensusService::new(ConsensusDependencies {
//!     config,
//!     signer,
//!     local_ip,
//!     peers,
//!     broadcaster,
//!     chain,
//!     directory,
//!     mempool,
//!     time_source,
//! }));
//!
//! tokio::spawn(service.clone().run(shutdown_rx));
//! ```

pub mod adapters;
pub mod domain;
pub mod ipc;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::{InMemoryChain, LoopbackNetwork, Member, StaticDirectory};
pub use domain::{
    create_proof, resolve, select_canonical, select_winner, verify_proof, ConsensusConfig,
    ConsensusError, ConsensusResult, ExclusionPolicy, FailedProducerTracker, PeerError,
    RoundPhase, RoundState,
};
pub use ipc::InboundHandler;
pub use ports::{
    Broadcaster, ChainView, ConsensusApi, MempoolGateway, OutboundMessage, PeerClient,
    RegistryGateway, ValidatorDirectory,
};
pub use service::{ConsensusDependencies, ConsensusService, HeightOutcome};
