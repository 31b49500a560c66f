//! # Domain Layer - Mempool Subsystem
//!
//! Pure admission logic: no I/O, no clocks, no locks.
//!
//! ## Components
//!
//! - `entities`: Rating, PooledTransaction, MempoolConfig
//! - `pool`: TransactionPool with priority index and caps
//! - `services`: fee floor, staleness window, rating
//! - `locked_balance`: per-sender committed value
//! - `dos_protection`: rolling rejection cache
//! - `errors`: MempoolError enumeration

pub mod dos_protection;
pub mod entities;
pub mod errors;
pub mod locked_balance;
pub mod pool;
pub mod services;
pub mod value_objects;

pub use dos_protection::*;
pub use entities::*;
pub use errors::*;
pub use locked_balance::*;
pub use pool::*;
pub use services::*;
pub use value_objects::*;
