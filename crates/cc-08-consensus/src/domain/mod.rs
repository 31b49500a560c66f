//! Domain layer for the consensus subsystem
//!
//! Pure logic, no I/O:
//! - proof: proof generation and verification
//! - selector: leader election and the finalization vote
//! - fork_choice: smallest-hash rule for competing blocks
//! - failed_producers: no-show strikes and election exclusion
//! - cadence: epoch-anchored block delay
//! - round: per-height state and phase machine

mod block;
mod cadence;
mod config;
mod error;
mod failed_producers;
mod fork_choice;
mod proof;
mod round;
mod selector;

pub use block::*;
pub use cadence::*;
pub use config::*;
pub use error::*;
pub use failed_producers::*;
pub use fork_choice::*;
pub use proof::*;
pub use round::*;
pub use selector::*;

pub(crate) use selector::election_key;
