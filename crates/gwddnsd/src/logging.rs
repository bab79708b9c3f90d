//! tracing subscriber setup

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// `--quiet` caps output at warnings regardless of the configured level
pub fn effective_level(configured: Level, quiet: bool) -> Level {
    if quiet && configured > Level::WARN {
        Level::WARN
    } else {
        configured
    }
}

/// Install the global fmt subscriber
pub fn init(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}
