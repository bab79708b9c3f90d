//! Component wiring shared by the binaries
//!
//! Thin integration only: everything here builds core components from
//! configuration and hands them to `gwddns-core`.

use std::time::Duration;

use anyhow::Result;
use gwddns_core::config::{HealthPolicy, NotifierConfig, WatchConfig};
use gwddns_core::traits::{CacheWriter, Notifier};
use gwddns_core::{
    FileCacheWriter, GatewayWatcher, GwddnsConfig, LogNotifier, PlatformConfig, ReconcileEvent,
    Reconciler, Registry,
};
use gwddns_platform_pfsense::PfSenseNotifier;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::trigger::CommandTrigger;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Registry with every built-in publisher and platform
pub fn registry() -> Registry {
    let registry = Registry::new();
    gwddns_provider_powerdns::register(&registry);
    gwddns_platform_pfsense::register(&registry);
    registry
}

/// Notifier for `config`; `None` when notifications are disabled
pub fn notifier(config: &NotifierConfig) -> Option<Box<dyn Notifier>> {
    match config {
        NotifierConfig::Log => Some(Box::new(LogNotifier)),
        NotifierConfig::PfSense { php_path } => Some(Box::new(PfSenseNotifier::new(php_path))),
        NotifierConfig::Disabled => None,
    }
}

/// Build the reconciler and its event receiver
pub async fn build_reconciler(
    registry: &Registry,
    config: &GwddnsConfig,
) -> Result<(Reconciler, mpsc::Receiver<ReconcileEvent>)> {
    let adapter = registry.create_platform(&config.platform)?;
    let publisher = registry.create_publisher(&config.publisher)?;
    let state_store = gwddns_core::state::from_config(&config.state_store).await?;

    let cache_writer: Option<Box<dyn CacheWriter>> = if config.cache.enabled {
        Some(Box::new(FileCacheWriter::new(&config.cache.directory)))
    } else {
        None
    };

    info!(
        "Reconciling {} via {} on {}",
        config.record.name,
        publisher.publisher_name(),
        adapter.platform_name()
    );

    Ok(Reconciler::new(
        adapter,
        publisher,
        state_store,
        cache_writer,
        notifier(&config.notifier),
        config,
    )?)
}

/// Log reconcile events until the reconciler is dropped
pub fn spawn_event_logger(mut events: mpsc::Receiver<ReconcileEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Event: {:?}", event);
        }
    })
}

/// Build the gateway watcher
pub fn build_watcher(
    registry: &Registry,
    platform: &PlatformConfig,
    policy: HealthPolicy,
    trigger: CommandTrigger,
) -> Result<GatewayWatcher> {
    let adapter = registry.create_platform(platform)?;
    Ok(GatewayWatcher::new(adapter, Box::new(trigger), policy))
}

/// Watch settings with command line overrides applied
pub fn watch_settings(
    mut settings: WatchConfig,
    interval_secs: Option<u64>,
    timeout_secs: Option<u64>,
) -> Result<(Duration, Duration)> {
    if let Some(interval) = interval_secs {
        settings.poll_interval_secs = interval;
    }
    if let Some(timeout) = timeout_secs {
        settings.run_timeout_secs = timeout;
    }
    if settings.poll_interval_secs == 0 || settings.run_timeout_secs == 0 {
        anyhow::bail!("Poll interval and run timeout must be > 0 seconds");
    }
    Ok((
        Duration::from_secs(settings.poll_interval_secs),
        Duration::from_secs(settings.run_timeout_secs),
    ))
}

/// Wait for SIGTERM or SIGINT
///
/// Returns the name of the signal received.
#[cfg(unix)]
pub async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
pub async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
