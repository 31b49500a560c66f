//! # Transaction Pool (Mempool)
//!
//! Admits, rates and orders unconfirmed transactions until a block
//! includes them.
//!
//! ## Admission
//!
//! | Step | Rejects with |
//! |------|--------------|
//! | Rejection cache | `PreviouslyRejected` |
//! | Address block-list | `BlockedAddress` |
//! | Staleness window | `TooOld`, `TooFarInFuture` |
//! | Pooled / mined | `DuplicateTransaction`, `AlreadyMined` |
//! | Content hash | `HashMismatch` |
//! | Key and signature | `InvalidSignature` |
//! | Nonce | `Replay`, `DoubleSpend` |
//! | Rating | `FeeTooLow`, `SenderQuotaFull`, `RatingTooLow` |
//! | Caps | `PoolFull`, `PoolSizeExceeded` |
//!
//! Ratings run `A` (best) to `F` (never admitted). Block selection and
//! eviction both walk the same priority index: best rating and oldest
//! timestamp first for selection, the reverse for eviction.
//!
//! ## Peer Blocks
//!
//! `validate_block` re-checks a received block's transactions against the
//! chain below that block's height: content hash, block-list, one use per
//! sender nonce, signature, replay and already-mined. Adopting a block
//! drops its transactions and any pooled transaction whose nonce it
//! consumed.
//!
//! ## Module Structure
//!
//! - `domain/` - pool, rating rules, rejection cache, locked balances
//! - `ports/inbound.rs` - [`MempoolApi`]
//! - `ports/outbound.rs` - [`ChainLookup`]
//! - `service/` - [`MempoolService`] and the eviction loop

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::*;
pub use service::MempoolService;
