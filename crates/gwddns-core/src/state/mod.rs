// # State Store Implementations
//
// This module provides implementations of the StateStore trait for
// different persistence strategies.

pub mod file;
pub mod lock;
pub mod memory;

pub use file::FileStateStore;
pub use lock::RunLock;
pub use memory::MemoryStateStore;

use crate::config::StateStoreConfig;
use crate::traits::StateStore;

/// Build the state store named by `config`
pub async fn from_config(config: &StateStoreConfig) -> crate::Result<Box<dyn StateStore>> {
    match config {
        StateStoreConfig::File { path } => Ok(Box::new(FileStateStore::new(path).await?)),
        StateStoreConfig::Memory => Ok(Box::new(MemoryStateStore::new())),
    }
}
