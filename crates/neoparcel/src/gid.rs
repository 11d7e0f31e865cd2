//! # Global Addresses
//!
//! Names for distributed entities. An address carries the locality that
//! issued it, so resolving it to a destination never needs a lookup table
//! for the common case.

use serde::Deserialize;
use serde::Serialize;

/// Strong type for locality (process) identifiers.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalityId(pub u32);

impl LocalityId {
    /// Reserved id that never names a live locality.
    pub const INVALID: LocalityId = LocalityId(u32::MAX);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// The address of this locality's runtime-support component.
    pub fn address(&self) -> GlobalAddress {
        GlobalAddress { locality: *self, local: 0 }
    }
}

impl std::fmt::Display for LocalityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "locality-{}", self.0)
    }
}

/// Unique identifier of a distributed entity.
///
/// `local == 0` is reserved for the locality itself; allocators hand out
/// addresses starting at 1 and never reuse them.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobalAddress {
    pub locality: LocalityId,
    pub local: u64,
}

impl GlobalAddress {
    /// The "no target" sentinel.
    pub const INVALID: GlobalAddress = GlobalAddress {
        locality: LocalityId::INVALID,
        local: 0,
    };

    pub fn new(locality: LocalityId, local: u64) -> Self {
        Self { locality, local }
    }

    pub fn is_valid(&self) -> bool {
        self.locality.is_valid()
    }

    /// Returns true if this address names a locality rather than a component.
    pub fn is_locality(&self) -> bool {
        self.is_valid() && self.local == 0
    }
}

impl Default for GlobalAddress {
    fn default() -> Self {
        Self::INVALID
    }
}

impl std::fmt::Display for GlobalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{{{}:{}}}", self.locality.0, self.local)
        } else {
            write!(f, "{{invalid}}")
        }
    }
}
