//! Runtime configuration.

use neoparcel::LocalityId;

/// Default ceiling for one encoded frame: 16 MiB.
pub const DEFAULT_MAX_PARCEL_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The locality this runtime hosts.
    pub locality: LocalityId,
    /// Outbound frames larger than this fail with `PayloadTooLarge`.
    pub max_parcel_bytes: usize,
}

impl Config {
    pub fn new(locality: LocalityId) -> Self {
        Self {
            locality,
            max_parcel_bytes: DEFAULT_MAX_PARCEL_BYTES,
        }
    }
}
