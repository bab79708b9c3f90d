// # File State Store
//
// Keeps the last-published healthy sets in a JSON file. Each reconciler
// invocation is usually a fresh process, so `load` goes to disk every time.
//
// ## Durability
//
// A save writes `<file>.tmp`, copies the current file to `<file>.backup`
// and renames the temp file over the original. A file that no longer parses
// is answered from the backup (which is also copied back into place); with
// no usable backup the store reports empty state, so the next run publishes.
//
// Runs against the same file exclude each other through `<file>.lock`, so a
// cron-started run and a watcher-triggered run never publish concurrently.
//
// ## File Format
//
// ```json
// {
//   "ipv4": { "203.0.113.5": "2025-01-09T12:00:00.000000Z" },
//   "ipv6": { "2001:db8::5": "2025-01-09T12:00:00.000000Z" }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::Error;
use crate::state::RunLock;
use crate::traits::state_store::{PersistedState, StateStore};

/// JSON file state store
///
/// # Example
///
/// ```rust,no_run
/// use gwddns_core::state::FileStateStore;
/// use gwddns_core::traits::{PersistedState, StateStore};
/// use std::collections::BTreeSet;
/// use std::net::{Ipv4Addr, Ipv6Addr};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/db/gwddns.state.json").await?;
///
///     let healthy_v4: BTreeSet<Ipv4Addr> = ["203.0.113.5".parse()?].into();
///     let healthy_v6: BTreeSet<Ipv6Addr> = BTreeSet::new();
///     let state = PersistedState::stamped(&healthy_v4, &healthy_v6, chrono::Utc::now());
///     store.save(&state).await?;
///
///     assert_eq!(store.load().await?, state);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    /// One save at a time within this process
    write_lock: Mutex<()>,
}

impl FileStateStore {
    /// Open the store at `path`; missing parent directories are created
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
                fs::create_dir_all(dir).await.map_err(|e| {
                    Error::config(format!("Cannot create {} for the state file: {}", dir.display(), e))
                })?;
            }
            _ => {}
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, extension: &str) -> PathBuf {
        self.path.with_extension(extension)
    }

    /// Parse `path`; `None` when the file is absent or blank
    async fn read(path: &Path) -> Result<Option<PersistedState>, Error> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::state_store(format!("Cannot read {}: {}", path.display(), e)));
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Fall back to the backup after the main file failed to parse
    async fn recover(&self, cause: Error) -> PersistedState {
        let backup = self.sibling("backup");
        tracing::warn!("Unreadable state in {}: {}", self.path.display(), cause);

        match Self::read(&backup).await {
            Ok(Some(state)) => {
                match fs::copy(&backup, &self.path).await {
                    Ok(_) => tracing::info!("State restored from {}", backup.display()),
                    Err(e) => tracing::error!("Cannot put {} back in place: {}", backup.display(), e),
                }
                state
            }
            Ok(None) => {
                tracing::warn!("No state backup available; treating state as empty");
                PersistedState::default()
            }
            Err(e) => {
                tracing::error!("State backup unusable too ({}); treating state as empty", e);
                PersistedState::default()
            }
        }
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<PersistedState, Error> {
        match Self::read(&self.path).await {
            Ok(state) => {
                let state = state.unwrap_or_default();
                tracing::debug!(
                    "Persisted state: {} IPv4, {} IPv6",
                    state.ipv4.len(),
                    state.ipv6.len()
                );
                Ok(state)
            }
            Err(cause @ Error::Json(_)) => Ok(self.recover(cause).await),
            Err(e) => Err(e),
        }
    }

    async fn save(&self, state: &PersistedState) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(state)?;
        let _guard = self.write_lock.lock().await;

        let staging = self.sibling("tmp");
        fs::write(&staging, &json).await.map_err(|e| {
            Error::state_store(format!("Cannot stage state in {}: {}", staging.display(), e))
        })?;

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, self.sibling("backup")).await
        {
            tracing::warn!("State backup skipped: {}", e);
        }

        fs::rename(&staging, &self.path).await.map_err(|e| {
            Error::state_store(format!("Cannot move state into {}: {}", self.path.display(), e))
        })?;

        tracing::trace!("State saved to {}", self.path.display());
        Ok(())
    }

    async fn lock_run(&self) -> Result<Option<RunLock>, Error> {
        RunLock::acquire(self.sibling("lock")).await.map(Some)
    }
}
