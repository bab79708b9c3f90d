//! File-based cache markers
//!
//! One marker per (logical interface, DynDNS entry) pair, named the way the
//! platform's own DynDNS client looks for it:
//! `{directory}/dyndns_{interface}custom''{entry_id}.cache`.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

use crate::error::{Error, Result};
use crate::topology::CacheTarget;
use crate::traits::{CacheMarker, CacheWriter};

/// Writes cache markers as plain files under one directory
#[derive(Debug, Clone)]
pub struct FileCacheWriter {
    directory: PathBuf,
}

impl FileCacheWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl CacheWriter for FileCacheWriter {
    fn marker_path(&self, target: &CacheTarget) -> PathBuf {
        self.directory.join(format!(
            "dyndns_{}custom''{}.cache",
            target.logical_interface, target.entry_id
        ))
    }

    async fn write_marker(&self, target: &CacheTarget, marker: &CacheMarker) -> Result<()> {
        let path = self.marker_path(target);
        fs::write(&path, marker.content()).await.map_err(|e| {
            Error::cache(format!("Failed to write {}: {}", path.display(), e))
        })?;
        tracing::debug!("Wrote cache marker {} for {}", path.display(), marker.address);
        Ok(())
    }
}
