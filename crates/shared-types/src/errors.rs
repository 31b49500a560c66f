//! # Error Types
//!
//! The cross-crate error taxonomy and the payload guard's error type.

use thiserror::Error;

/// Coarse classification every crate-level error maps into.
///
/// Callers use it to decide between dropping input silently, counting an
/// authentication failure, or surfacing an internal fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input that cannot be parsed or violates a structural cap.
    Malformed,
    /// Signature, key or identity check failed.
    Authentication,
    /// Already seen, too old or too far in the future.
    StaleOrDuplicate,
    /// Peers disagree on the round outcome.
    ProtocolDisagreement,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Authentication => "authentication",
            Self::StaleOrDuplicate => "stale_or_duplicate",
            Self::ProtocolDisagreement => "protocol_disagreement",
            Self::Internal => "internal",
        }
    }
}

/// Errors raised while bounding and decoding a raw peer payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Payload too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Nesting depth {depth} exceeds {limit}")]
    TooDeep { depth: usize, limit: usize },

    #[error("Collection of {count} elements exceeds {limit}")]
    CollectionTooLarge { count: usize, limit: usize },

    #[error("Unknown message code: {0}")]
    UnknownCode(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

impl PayloadError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_error_display() {
        let err = PayloadError::TooLarge {
            size: 10,
            limit: 5,
        };
        assert_eq!(err.to_string(), "Payload too large: 10 bytes exceeds 5");
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
