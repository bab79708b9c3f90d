// # Cache Writer Trait
//
// Defines the interface for writing per-address cache markers.
//
// ## Purpose
//
// The host platform's own DynDNS client decides whether to push an address
// by comparing it against a cache file. Writing the bare address marks it as
// already published; appending a newline makes the comparison fail, so the
// platform client considers the address stale and leaves the record alone.
//
// ## Implementations
//
// - File-based: `FileCacheWriter` in this crate

use async_trait::async_trait;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::topology::CacheTarget;

/// Content of one cache marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMarker {
    pub address: IpAddr,
    pub healthy: bool,
}

impl CacheMarker {
    pub fn healthy(address: IpAddr) -> Self {
        Self {
            address,
            healthy: true,
        }
    }

    pub fn unhealthy(address: IpAddr) -> Self {
        Self {
            address,
            healthy: false,
        }
    }

    /// Exact file content: the address, plus a trailing newline when unhealthy
    pub fn content(&self) -> String {
        if self.healthy {
            self.address.to_string()
        } else {
            format!("{}\n", self.address)
        }
    }
}

/// Trait for cache marker writers
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Forbidden Capabilities
/// - ❌ Decide which addresses get markers (owned by `Reconciler`)
/// - ❌ Write anything but the marker content
#[async_trait]
pub trait CacheWriter: Send + Sync {
    /// Location of the marker for `target`
    fn marker_path(&self, target: &CacheTarget) -> PathBuf;

    /// Overwrite the marker for `target` with `marker`
    async fn write_marker(&self, target: &CacheTarget, marker: &CacheMarker) -> Result<(), crate::Error>;
}
