//! Domain services for the Mempool subsystem.
//!
//! Stateless admission rules: fee floor, staleness window, caps and rating.

use super::entities::{MempoolConfig, Rating};
use super::errors::MempoolError;
use shared_types::{Timestamp, Transaction};

/// Size in started kilobytes (1 byte = 1 KB, 1025 bytes = 2 KB).
pub fn ceil_size_kb(size_bytes: usize) -> u64 {
    size_bytes.div_ceil(1024) as u64
}

/// Fee floor for a transaction of the given size.
pub fn required_fee(size_bytes: usize, min_fee_per_kb: u64) -> u64 {
    ceil_size_kb(size_bytes).saturating_mul(min_fee_per_kb)
}

/// True unless the transaction is a transfer paying less than the floor.
pub fn minimum_fee_ok(tx: &Transaction, min_fee_per_kb: u64) -> bool {
    tx.kind.is_fee_exempt() || tx.fee >= required_fee(tx.serialized_size(), min_fee_per_kb)
}

/// True if a transaction of `tx_size` fits under both caps.
pub fn can_admit(tx_size: usize, current_count: usize, current_size_bytes: usize, config: &MempoolConfig) -> bool {
    current_count < config.max_entries
        && current_size_bytes.saturating_add(tx_size) <= config.max_size_bytes
}

/// Accept iff `now - max_age <= timestamp <= now + max_skew`. Historical
/// import skips the age bound only.
pub fn check_staleness(
    timestamp: Timestamp,
    now: Timestamp,
    config: &MempoolConfig,
) -> Result<(), MempoolError> {
    if timestamp > now + config.max_future_skew_secs {
        return Err(MempoolError::TooFarInFuture { timestamp, now });
    }
    if !config.historical_import && timestamp < now - config.max_tx_age_secs {
        return Err(MempoolError::TooOld { timestamp, now });
    }
    Ok(())
}

/// Rate a transaction by how many times over the fee floor it pays.
///
/// | multiple of floor | rating |
/// |-------------------|--------|
/// | >= 8 | A |
/// | >= 4 | B |
/// | >= 2 | C |
/// | >= 1 | D |
/// | below, fee-exempt kind | E |
/// | below, transfer | F |
///
/// Senders already holding half their quota drop one letter; a full quota
/// is always `F`.
pub fn assign_rating(
    tx: &Transaction,
    size_bytes: usize,
    sender_pending: usize,
    config: &MempoolConfig,
) -> Rating {
    if sender_pending >= config.max_per_sender {
        return Rating::F;
    }

    let floor = required_fee(size_bytes, config.min_fee_per_kb);
    let base = if floor == 0 {
        Rating::A
    } else {
        match tx.fee / floor {
            m if m >= 8 => Rating::A,
            m if m >= 4 => Rating::B,
            m if m >= 2 => Rating::C,
            m if m >= 1 => Rating::D,
            _ if tx.kind.is_fee_exempt() => Rating::E,
            _ => Rating::F,
        }
    };

    if sender_pending * 2 >= config.max_per_sender && sender_pending > 0 {
        base.downgrade()
    } else {
        base
    }
}
