//! # Payload Guard
//!
//! Structural caps on raw JSON enforced before `serde_json` sees the bytes.
//! A single linear pass measures nesting depth and per-container element
//! counts, so hostile payloads are rejected without allocating a tree.

use crate::errors::PayloadError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Default cap for a serialized block (1.2 MB).
pub const MAX_BLOCK_BYTES: usize = 1_200_000;
/// Default cap for a serialized transaction (512 KB).
pub const MAX_TRANSACTION_BYTES: usize = 512 * 1024;
/// Default cap for any other JSON payload (1 MB).
pub const MAX_JSON_BYTES: usize = 1024 * 1024;
pub const MAX_JSON_DEPTH: usize = 5;
pub const MAX_COLLECTION_ELEMENTS: usize = 1000;

/// Size and shape limits for inbound payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadLimits {
    pub max_block_bytes: usize,
    pub max_transaction_bytes: usize,
    pub max_json_bytes: usize,
    pub max_depth: usize,
    pub max_collection_elements: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_block_bytes: MAX_BLOCK_BYTES,
            max_transaction_bytes: MAX_TRANSACTION_BYTES,
            max_json_bytes: MAX_JSON_BYTES,
            max_depth: MAX_JSON_DEPTH,
            max_collection_elements: MAX_COLLECTION_ELEMENTS,
        }
    }
}

impl PayloadLimits {
    /// Check size, depth and collection caps without parsing.
    pub fn check(&self, bytes: &[u8], max_bytes: usize) -> Result<(), PayloadError> {
        if bytes.len() > max_bytes {
            return Err(PayloadError::TooLarge {
                size: bytes.len(),
                limit: max_bytes,
            });
        }
        scan_structure(bytes, self.max_depth, self.max_collection_elements)
    }

    /// Check caps, then deserialize.
    pub fn decode<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
        max_bytes: usize,
    ) -> Result<T, PayloadError> {
        self.check(bytes, max_bytes)?;
        serde_json::from_slice(bytes).map_err(|e| PayloadError::InvalidJson(e.to_string()))
    }
}

/// Walk the bytes once tracking string state, container depth and the
/// element count of each open container.
fn scan_structure(bytes: &[u8], max_depth: usize, max_elements: usize) -> Result<(), PayloadError> {
    let mut counts: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for &b in bytes {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b' ' | b'\n' | b'\r' | b'\t' | b':' => continue,
            b',' => {
                if let Some(count) = counts.last_mut() {
                    *count += 1;
                    if *count > max_elements {
                        return Err(PayloadError::CollectionTooLarge {
                            count: *count,
                            limit: max_elements,
                        });
                    }
                }
                continue;
            }
            b']' | b'}' => {
                counts.pop();
                continue;
            }
            _ => {}
        }

        // First token of a value (or key) inside the current container.
        if let Some(count) = counts.last_mut() {
            if *count == 0 {
                *count = 1;
            }
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => {
                counts.push(0);
                if counts.len() > max_depth {
                    return Err(PayloadError::TooDeep {
                        depth: counts.len(),
                        limit: max_depth,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(())
}
