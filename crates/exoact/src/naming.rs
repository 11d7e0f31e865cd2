//! # Naming & Routing
//!
//! Issues global addresses and resolves them to the locality that hosts
//! them. The heavy lifting of a real directory service (migration, caching,
//! reference counting) belongs to an external collaborator behind the
//! `Directory` trait; the runtime only needs `resolve`.

use std::collections::BTreeSet;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use neoparcel::GlobalAddress;
use neoparcel::LocalityId;

/// Where an invocation has to run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    /// The addressed entity lives in this process.
    Local,
    /// The addressed entity lives on another locality.
    Remote(LocalityId),
}

/// Hands out fresh addresses for one locality.
///
/// Addresses are monotonic and never reused. Slot 0 is the locality itself.
pub struct AddressAllocator {
    locality: LocalityId,
    next: AtomicU64,
}

impl AddressAllocator {
    pub fn new(locality: LocalityId) -> Self {
        Self {
            locality,
            next: AtomicU64::new(1),
        }
    }

    /// Issues an address no other entity has held.
    pub fn allocate(&self) -> GlobalAddress {
        let local = self.next.fetch_add(1, Ordering::Relaxed);
        GlobalAddress::new(self.locality, local)
    }
}

/// Maps an address to the locality that currently hosts it.
pub trait Directory: Send + Sync + 'static {
    /// Returns `None` if the address cannot be routed anywhere.
    fn resolve(&self, address: GlobalAddress) -> Option<LocalityId>;
}

/// A directory for a fixed set of localities where entities never migrate.
///
/// Every address resolves to the locality that issued it, provided that
/// locality is a member.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    members: BTreeSet<LocalityId>,
}

impl StaticDirectory {
    pub fn new(members: impl IntoIterator<Item = LocalityId>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }
}

impl Directory for StaticDirectory {
    fn resolve(&self, address: GlobalAddress) -> Option<LocalityId> {
        if !address.is_valid() {
            return None;
        }
        self.members.contains(&address.locality).then_some(address.locality)
    }
}
