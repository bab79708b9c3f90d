//! Gateway status watch loop
//!
//! The watcher only looks at gateway health. It keeps the status map from
//! the previous poll and, whenever a non-empty map differs from it, asks a
//! [`RunTrigger`] for a forced reconciliation. Everything else (topology,
//! addresses, publishing) is the reconciler's business.
//!
//! ```text
//!   interval tick ──▶ gateway_statuses ──▶ changed? ──yes──▶ RunTrigger
//!                                              │                 │
//!                                              no                ▼
//!                                              └──────▶ previous := current
//! ```

use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

use crate::config::HealthPolicy;
use crate::error::Result;
use crate::health::{self, GatewayStatusMap};
use crate::traits::{PlatformAdapter, RunTrigger, TriggerRequest};

/// Polls gateway health and triggers reconciliation on change
pub struct GatewayWatcher {
    adapter: Box<dyn PlatformAdapter>,
    trigger: Box<dyn RunTrigger>,
    policy: HealthPolicy,
    previous: Mutex<GatewayStatusMap>,
}

impl GatewayWatcher {
    pub fn new(
        adapter: Box<dyn PlatformAdapter>,
        trigger: Box<dyn RunTrigger>,
        policy: HealthPolicy,
    ) -> Self {
        Self {
            adapter,
            trigger,
            policy,
            previous: Mutex::new(GatewayStatusMap::new()),
        }
    }

    /// Record the current status map as the baseline, without triggering
    pub async fn prime(&self) -> GatewayStatusMap {
        let initial = health::gateway_statuses(self.adapter.as_ref(), &self.policy).await;
        info!("Initial gateway status: {:?}", initial);
        *self.previous.lock().await = initial.clone();
        initial
    }

    /// The status map the next poll compares against
    pub async fn previous(&self) -> GatewayStatusMap {
        self.previous.lock().await.clone()
    }

    /// Poll once; returns whether a run was triggered
    ///
    /// An empty map (no probe data at all) never triggers and never replaces
    /// the baseline.
    pub async fn poll_once(&self) -> bool {
        let current = health::gateway_statuses(self.adapter.as_ref(), &self.policy).await;
        let mut previous = self.previous.lock().await;

        if current.is_empty() || current == *previous {
            debug!("Gateway status unchanged");
            return false;
        }

        info!("Gateway status change detected");
        info!("    Old status: {:?}", *previous);
        info!("    New status: {:?}", current);

        let ipv4_only = match self.adapter.ipv6_updates_configured().await {
            Ok(configured) => !configured,
            Err(e) => {
                warn!("Could not check for IPv6 DynDNS entries, assuming present: {}", e);
                false
            }
        };
        if ipv4_only {
            info!("No IPv6 DynDNS configuration found, restricting run to IPv4");
        }

        let request = TriggerRequest::gateway_event(ipv4_only);
        if let Err(e) = self.trigger.trigger(&request).await {
            error!("Failed to trigger reconciliation: {}", e);
        }

        *previous = current;
        true
    }

    /// Poll every `interval` until shutdown
    ///
    /// With `shutdown_rx` the loop stops when it fires (or its sender is
    /// dropped); without it the loop stops on Ctrl-C.
    pub async fn run_with_shutdown(
        &self,
        interval: Duration,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(ticker);

        info!("Gateway watcher started, polling every {:?}", interval);

        if let Some(mut rx) = shutdown_rx {
            loop {
                tokio::select! {
                    Some(_) = ticks.next() => {
                        self.poll_once().await;
                    }
                    _ = &mut rx => {
                        info!("Shutdown signal received");
                        break;
                    }
                }
            }
        } else {
            loop {
                tokio::select! {
                    Some(_) = ticks.next() => {
                        self.poll_once().await;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                        break;
                    }
                }
            }
        }

        info!("Gateway watcher stopped");
        Ok(())
    }
}
