//! # Registry Errors

use shared_types::{Address, ErrorKind};
use thiserror::Error;

/// Errors from registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Registry full: capacity {capacity}")]
    Full { capacity: usize },

    #[error("Unknown validator: {0}")]
    UnknownValidator(Address),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Full { .. } => ErrorKind::Internal,
            Self::UnknownValidator(_) => ErrorKind::StaleOrDuplicate,
        }
    }
}

/// The specific reason an authentication attempt failed.
///
/// Logged locally; never sent to the remote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailureCause {
    #[error("source IP is banned")]
    Banned,

    #[error("source IP is rate limited")]
    RateLimited,

    #[error("field {field} is {len} bytes, limit {limit}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        limit: usize,
    },

    #[error("unparseable IP address")]
    InvalidIp,

    #[error("public key does not derive the advertised address")]
    KeyAddressMismatch,

    #[error("signature message does not bind the advertised fields")]
    MessageMismatch,

    #[error("signature verification failed")]
    BadSignature,

    #[error("advertisement timestamp outside the accepted window")]
    StaleAdvertisement,

    #[error("address is block-listed")]
    Blocked,

    #[error("account lookup rejected the address")]
    UnknownAccount,
}

/// Authentication failure as seen by the remote: one generic message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("authentication failed")]
pub struct AuthError {
    cause: AuthFailureCause,
}

impl AuthError {
    pub fn new(cause: AuthFailureCause) -> Self {
        Self { cause }
    }

    /// The local-only reason.
    pub fn cause(&self) -> &AuthFailureCause {
        &self.cause
    }

    pub fn kind(&self) -> ErrorKind {
        match self.cause {
            AuthFailureCause::FieldTooLong { .. } | AuthFailureCause::InvalidIp => {
                ErrorKind::Malformed
            }
            AuthFailureCause::StaleAdvertisement => ErrorKind::StaleOrDuplicate,
            _ => ErrorKind::Authentication,
        }
    }
}

/// Failure to ingest an advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(e) => e.kind(),
            Self::Registry(e) => e.kind(),
        }
    }
}
