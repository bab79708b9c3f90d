// # Notifier Trait
//
// Defines the interface for telling an operator that the published record
// changed.
//
// ## Implementations
//
// - Log only: `LogNotifier` in this crate
// - pfSense system notices: `gwddns-platform-pfsense` crate

use async_trait::async_trait;

/// Trait for change notification sinks
///
/// Notification is best effort. The reconciler logs a failed `notify` and
/// still reports the run as published.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification
    async fn notify(&self, subject: &str, body: &str) -> Result<(), crate::Error>;

    /// Notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}
