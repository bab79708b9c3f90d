// # Memory State Store
//
// Keeps the published sets for the life of the process. Useful for tests
// and embedding; a restart forgets everything, so the first run afterwards
// always publishes.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{PersistedState, StateStore};

/// In-memory state store implementation
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<PersistedState>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `state`
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Snapshot of the current state
    pub async fn snapshot(&self) -> PersistedState {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<PersistedState, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), Error> {
        *self.inner.write().await = state.clone();
        Ok(())
    }
}
