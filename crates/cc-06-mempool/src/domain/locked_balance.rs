//! # Locked Balance
//!
//! Value committed by pending transactions, per sender. Releases saturate
//! at zero so an out-of-order unlock can never drive a counter negative.

use super::entities::Address;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockedBalance(u64);

impl LockedBalance {
    pub fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub fn amount(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn lock(self, amount: u64) -> Self {
        Self(self.0.saturating_add(amount))
    }

    #[must_use]
    pub fn release(self, amount: u64) -> Self {
        Self(self.0.saturating_sub(amount))
    }
}

/// Locked balances for every sender with pending transactions.
#[derive(Debug, Default)]
pub struct LockedBalanceLedger {
    balances: HashMap<Address, LockedBalance>,
}

impl LockedBalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&mut self, address: &Address, amount: u64) {
        let entry = self.balances.entry(address.clone()).or_default();
        *entry = entry.lock(amount);
    }

    pub fn release(&mut self, address: &Address, amount: u64) {
        if let Some(entry) = self.balances.get_mut(address) {
            *entry = entry.release(amount);
            if entry.amount() == 0 {
                self.balances.remove(address);
            }
        }
    }

    pub fn locked(&self, address: &Address) -> u64 {
        self.balances.get(address).map(|b| b.amount()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
