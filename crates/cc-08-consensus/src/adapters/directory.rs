//! Fixed validator directory

use crate::ports::ValidatorDirectory;
use parking_lot::{Mutex, RwLock};
use shared_types::Address;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One registered caster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub address: Address,
    pub ip: IpAddr,
    pub public_key: String,
}

impl Member {
    pub fn new(address: impl Into<Address>, ip: IpAddr, public_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ip,
            public_key: public_key.into(),
        }
    }
}

/// Directory with a hand-maintained member list. Liveness reports and forks
/// are only counted.
pub struct StaticDirectory {
    local: Address,
    members: RwLock<Vec<Member>>,
    check_failures: Mutex<HashMap<Address, u32>>,
    forks: AtomicUsize,
}

impl StaticDirectory {
    pub fn new(local: Address, members: Vec<Member>) -> Self {
        Self {
            local,
            members: RwLock::new(members),
            check_failures: Mutex::new(HashMap::new()),
            forks: AtomicUsize::new(0),
        }
    }

    pub fn add(&self, member: Member) {
        let mut members = self.members.write();
        members.retain(|m| m.address != member.address);
        members.push(member);
    }

    pub fn remove(&self, address: &Address) {
        self.members.write().retain(|m| m.address != *address);
    }

    /// Failed checks since the last successful one.
    pub fn check_failures(&self, address: &Address) -> u32 {
        self.check_failures.lock().get(address).copied().unwrap_or(0)
    }

    pub fn fork_count(&self) -> usize {
        self.forks.load(Ordering::Relaxed)
    }

    fn find<T>(&self, address: &Address, f: impl FnOnce(&Member) -> T) -> Option<T> {
        self.members.read().iter().find(|m| m.address == *address).map(f)
    }
}

impl ValidatorDirectory for StaticDirectory {
    fn casting_set(&self) -> Vec<Address> {
        self.members
            .read()
            .iter()
            .filter(|m| m.address != self.local)
            .map(|m| m.address.clone())
            .collect()
    }

    fn ip_of(&self, address: &Address) -> Option<IpAddr> {
        self.find(address, |m| m.ip)
    }

    fn public_key_of(&self, address: &Address) -> Option<String> {
        self.find(address, |m| m.public_key.clone())
    }

    fn peer_ips(&self) -> Vec<IpAddr> {
        self.members
            .read()
            .iter()
            .filter(|m| m.address != self.local)
            .map(|m| m.ip)
            .collect()
    }

    fn record_liveness(&self, address: &Address, reachable: bool) {
        let mut failures = self.check_failures.lock();
        if reachable {
            failures.remove(address);
        } else {
            *failures.entry(address.clone()).or_insert(0) += 1;
        }
    }

    fn note_fork(&self) {
        self.forks.fetch_add(1, Ordering::Relaxed);
    }
}
