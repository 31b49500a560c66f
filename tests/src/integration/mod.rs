//! Cross-crate integration flows.

mod devnet;
mod flows;
