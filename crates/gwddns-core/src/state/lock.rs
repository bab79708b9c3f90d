//! Cross-process run exclusion
//!
//! Each `gwddns` invocation is its own process, so the run mutex inside a
//! `Reconciler` only orders runs of that one instance. Runs that share a
//! state file also take an exclusive advisory lock on `<state>.lock`. The
//! OS releases it when the holder exits, even after a crash.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::Error;

/// Exclusive lock held for one reconciliation run; released on drop
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Wait until the lock at `path` is held by this process
    pub async fn acquire(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        tokio::task::spawn_blocking(move || Self::acquire_blocking(path))
            .await
            .map_err(|e| Error::state_store(format!("Run lock task failed: {}", e)))?
    }

    fn acquire_blocking(path: PathBuf) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                Error::state_store(format!("Cannot open run lock {}: {}", path.display(), e))
            })?;

        FileExt::lock_exclusive(&file).map_err(|e| {
            Error::state_store(format!("Cannot lock {}: {}", path.display(), e))
        })?;
        tracing::debug!("Holding run lock {}", path.display());

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}
