//! Inbound message handling

mod handler;

pub use handler::*;
