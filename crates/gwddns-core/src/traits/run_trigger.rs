// # Run Trigger Trait
//
// Defines how the gateway watcher starts a reconciliation run.
//
// ## Implementations
//
// - Subprocess: `CommandTrigger` in the `gwddnsd` crate
// - In-process: tests and embedders call a `Reconciler` directly

use async_trait::async_trait;

/// Parameters of one watcher-initiated run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    /// Free-form reason, logged by the run
    pub reason: String,
    /// Publish even when the healthy sets did not change
    pub force_update: bool,
    /// Restrict the run to IPv4
    pub ipv4_only: bool,
}

impl TriggerRequest {
    /// The request the watcher issues on a gateway status change
    pub fn gateway_event(ipv4_only: bool) -> Self {
        Self {
            reason: "Gateway-Event".to_string(),
            force_update: true,
            ipv4_only,
        }
    }
}

/// Trait for starting one reconciliation run
///
/// Implementations return once the run finished or was abandoned. Errors
/// are logged by the watcher and never stop it.
#[async_trait]
pub trait RunTrigger: Send + Sync {
    async fn trigger(&self, request: &TriggerRequest) -> Result<(), crate::Error>;
}
