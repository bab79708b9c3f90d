//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Gathering gateway, topology and address facts from the PlatformAdapter
//! - Classifying gateways and partitioning addresses by health
//! - Deciding whether the published record is stale
//! - Publishing via DnsPublisher, then persisting state and cache markers
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ PlatformAdapter  │─── thresholds, probes, maps, addresses ───┐
//! └──────────────────┘                                           │
//!                                                                ▼
//!                                                      ┌──────────────┐
//!                                                      │  Reconciler  │
//!                                                      └──────────────┘
//!                                                                │
//!        ┌──────────────────┬──────────────────┬─────────────────┼──────────────┐
//!        ▼                  ▼                  ▼                 ▼              ▼
//! ┌─────────────┐   ┌──────────────┐   ┌─────────────┐   ┌────────────┐  ┌───────────┐
//! │ StateStore  │   │ DnsPublisher │   │ CacheWriter │   │  Notifier  │  │  Events   │
//! │ (diff/save) │   │ (replace)    │   │ (markers)   │   │ (summary)  │  │ (monitor) │
//! └─────────────┘   └──────────────┘   └─────────────┘   └────────────┘  └───────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Gather every platform fact concurrently; failures degrade to empty
//! 2. Classify gateways, resolve topology, partition addresses
//! 3. Compare the healthy sets against the persisted state
//! 4. If changed (or forced), replace the A/AAAA record sets
//! 5. Only on success: persist, write cache markers, notify

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::{GwddnsConfig, HealthPolicy, RecordConfig};
use crate::error::Result;
use crate::health::{self, GatewayStatusMap};
use crate::notify::{NOTIFY_SUBJECT, change_body};
use crate::partition::{FamilyFilter, HealthPartition, classify_addresses};
use crate::topology::{Topology, TopologyMaps};
use crate::traits::{
    CacheMarker, CacheWriter, DnsPublisher, IpFamily, Notifier, PersistedState, PlatformAdapter,
    ReplaceRequest, StateStore,
};

/// Capacity of the event channel returned by [`Reconciler::new`]
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Phases of one reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    Idle,
    Gathering,
    Classifying,
    Deciding,
    Publishing,
    Persisting,
    CacheWriting,
    Notifying,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Gathering => "gathering",
            RunPhase::Classifying => "classifying",
            RunPhase::Deciding => "deciding",
            RunPhase::Publishing => "publishing",
            RunPhase::Persisting => "persisting",
            RunPhase::CacheWriting => "cache-writing",
            RunPhase::Notifying => "notifying",
        };
        f.write_str(name)
    }
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Run started
    RunStarted { reason: String, forced: bool },

    /// A phase was entered
    PhaseEntered { phase: RunPhase },

    /// Healthy sets match the persisted state; nothing to do
    NoChange,

    /// Record sets replaced
    Published { a_count: usize, aaaa_count: usize },

    /// Record replace failed
    PublishFailed { error: String },

    /// One cache marker could not be written
    MarkerFailed { address: IpAddr, error: String },

    /// Run finished
    RunFinished { success: bool },
}

/// Parameters of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Publish even if the healthy sets did not change
    pub force_update: bool,
    /// Which family is published and cached
    pub family: FamilyFilter,
    /// Free-form reason for the run, logged only
    pub reason: String,
    /// Stop after deciding; no publish and no side effects
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force_update: false,
            family: FamilyFilter::Both,
            reason: "Scheduled".to_string(),
            dry_run: false,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing changed and no update was forced
    Unchanged,
    /// An update was due but the run was a dry run
    DryRun,
    /// The publisher confirmed the replace
    Published,
    /// The publisher rejected or failed the replace
    PublishFailed { error: String },
}

/// Summary of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub reason: String,
    pub forced: bool,
    pub partition: HealthPartition,
    pub outcome: RunOutcome,
    pub markers_written: usize,
    pub marker_failures: usize,
    pub state_saved: bool,
    pub notified: bool,
}

impl RunReport {
    fn new(options: &RunOptions, partition: HealthPartition, outcome: RunOutcome) -> Self {
        Self {
            reason: options.reason.clone(),
            forced: options.force_update,
            partition,
            outcome,
            markers_written: 0,
            marker_failures: 0,
            state_saved: false,
            notified: false,
        }
    }

    /// False only when publishing was attempted and failed
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, RunOutcome::PublishFailed { .. })
    }
}

/// Everything the gathering phase produced
struct Gathered {
    statuses: GatewayStatusMap,
    maps: TopologyMaps,
    discovered: BTreeSet<IpAddr>,
}

/// Gateway-health-aware reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::run()`] once per trigger (timer, gateway event, CLI)
/// 3. Drop to cleanup
///
/// ## Serialization
///
/// Concurrent calls to `run` on the same Reconciler queue up behind an
/// async mutex. Runs from other processes are kept out by the state store's
/// run lock (see [`StateStore::lock_run`]), so the persisted state is never
/// read and written by two runs at once.
pub struct Reconciler {
    /// Source of every platform fact
    adapter: Box<dyn PlatformAdapter>,

    /// DNS publisher for the record sets
    publisher: Box<dyn DnsPublisher>,

    /// Last-published healthy sets
    state_store: Box<dyn StateStore>,

    /// Cache marker writer; `None` disables markers
    cache_writer: Option<Box<dyn CacheWriter>>,

    /// Change notifier; `None` disables notifications
    notifier: Option<Box<dyn Notifier>>,

    /// The record kept in sync
    record: RecordConfig,

    /// Gateway health policy
    policy: HealthPolicy,

    /// Physical interfaces addresses are discovered on
    allowed_interfaces: Vec<String>,

    /// Held for the duration of a run
    run_lock: Mutex<()>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// reconcile events
    pub fn new(
        adapter: Box<dyn PlatformAdapter>,
        publisher: Box<dyn DnsPublisher>,
        state_store: Box<dyn StateStore>,
        cache_writer: Option<Box<dyn CacheWriter>>,
        notifier: Option<Box<dyn Notifier>>,
        config: &GwddnsConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let reconciler = Self {
            adapter,
            publisher,
            state_store,
            cache_writer,
            notifier,
            record: config.record.clone(),
            policy: config.health,
            allowed_interfaces: config.discovery.allowed_physical_interfaces.clone(),
            run_lock: Mutex::new(()),
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Run one reconciliation
    ///
    /// # Returns
    ///
    /// - `Ok(RunReport)`: The run completed; check `is_success()` for the
    ///   publish result
    /// - `Err(Error)`: The state store's run lock could not be taken.
    ///   Nothing was read or published. Data-source, cache and notify
    ///   failures degrade instead and never surface here.
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let _guard = self.run_lock.lock().await;
        let _exclusive = self.state_store.lock_run().await.map_err(|e| {
            error!("Another run could not be excluded: {}", e);
            e
        })?;

        info!(
            "Reconciliation started for {} (reason: {}, forced: {})",
            self.record.name, options.reason, options.force_update
        );
        self.emit_event(ReconcileEvent::RunStarted {
            reason: options.reason.clone(),
            forced: options.force_update,
        });

        let report = self.run_locked(options).await;

        self.enter(RunPhase::Idle);
        self.emit_event(ReconcileEvent::RunFinished {
            success: report.is_success(),
        });
        info!("Reconciliation finished: {:?}", report.outcome);

        Ok(report)
    }

    async fn run_locked(&self, options: &RunOptions) -> RunReport {
        self.enter(RunPhase::Gathering);
        let gathered = self.gather().await;

        self.enter(RunPhase::Classifying);
        let topology = Topology::new(gathered.maps);
        let partition = classify_addresses(&gathered.discovered, &topology, &gathered.statuses)
            .apply_filter(options.family);

        info!(
            "Healthy IPs: IPv4={:?}, IPv6={:?}",
            partition.healthy_v4, partition.healthy_v6
        );
        if partition.has_unhealthy() {
            info!(
                "Unhealthy IPs: IPv4={:?}, IPv6={:?}",
                partition.unhealthy_v4, partition.unhealthy_v6
            );
        }

        self.enter(RunPhase::Deciding);
        let previous = self.state_store.load().await.unwrap_or_else(|e| {
            warn!("Could not load previous state, treating as never published: {}", e);
            PersistedState::default()
        });

        let changed = previous.has_changed(&partition.healthy_v4, &partition.healthy_v6);
        if !options.force_update && !changed {
            info!("No changes detected. Nothing to do.");
            self.emit_event(ReconcileEvent::NoChange);
            return RunReport::new(options, partition, RunOutcome::Unchanged);
        }

        if options.force_update {
            info!("Forcing DNS update (reason: {})", options.reason);
        } else {
            info!("Change detected, performing DNS update");
        }

        let request = ReplaceRequest::new(&self.record.zone, &self.record.name, self.record.ttl)
            .with_a(partition.healthy_v4.iter().copied())
            .with_aaaa(partition.healthy_v6.iter().copied());

        if options.dry_run {
            info!(
                "Dry run: would replace {} with A={:?} AAAA={:?}",
                request.record_name, request.a, request.aaaa
            );
            return RunReport::new(options, partition, RunOutcome::DryRun);
        }

        self.enter(RunPhase::Publishing);
        if let Err(e) = self.publisher.replace_records(&request).await {
            error!(
                "DNS update via {} failed: {}",
                self.publisher.publisher_name(),
                e
            );
            self.emit_event(ReconcileEvent::PublishFailed {
                error: e.to_string(),
            });
            return RunReport::new(
                options,
                partition,
                RunOutcome::PublishFailed {
                    error: e.to_string(),
                },
            );
        }
        self.emit_event(ReconcileEvent::Published {
            a_count: request.a.len(),
            aaaa_count: request.aaaa.len(),
        });

        let mut report = RunReport::new(options, partition, RunOutcome::Published);

        self.enter(RunPhase::Persisting);
        let state = PersistedState::stamped(
            &report.partition.healthy_v4,
            &report.partition.healthy_v6,
            chrono::Utc::now(),
        );
        match self.state_store.save(&state).await {
            Ok(()) => report.state_saved = true,
            Err(e) => error!("Published, but could not persist state: {}", e),
        }

        self.enter(RunPhase::CacheWriting);
        self.write_markers(&topology, &mut report).await;

        self.enter(RunPhase::Notifying);
        report.notified = self.send_notification(&report.partition).await;

        info!("DNS update and cache files successful");
        report
    }

    /// Read every platform fact concurrently
    async fn gather(&self) -> Gathered {
        let adapter = self.adapter.as_ref();
        let allowlist = self.allowed_interfaces.as_slice();

        let (
            statuses,
            gateway_interfaces,
            physical_to_logical,
            address_interfaces,
            interface_cache_ids,
            v4,
            v6,
        ) = tokio::join!(
            health::gateway_statuses(adapter, &self.policy),
            adapter.gateway_interfaces(),
            adapter.physical_to_logical(),
            adapter.address_interfaces(),
            adapter.interface_cache_ids(),
            adapter.discover_addresses(IpFamily::V4, allowlist),
            adapter.discover_addresses(IpFamily::V6, allowlist),
        );

        debug!("Gateway statuses: {:?}", statuses);

        let mut discovered = or_empty(v4, "public IPv4 addresses");
        discovered.extend(or_empty(v6, "public IPv6 addresses"));

        Gathered {
            statuses,
            maps: TopologyMaps {
                gateway_interfaces: or_empty(gateway_interfaces, "gateway interface map"),
                physical_to_logical: or_empty(physical_to_logical, "interface map"),
                address_interfaces: or_empty(address_interfaces, "address map"),
                interface_cache_ids: or_empty(interface_cache_ids, "DynDNS entry ids"),
            },
            discovered,
        }
    }

    /// Write a marker for every classified address that has a cache target
    async fn write_markers(&self, topology: &Topology, report: &mut RunReport) {
        let Some(writer) = self.cache_writer.as_deref() else {
            debug!("Cache markers disabled");
            return;
        };

        let markers: Vec<CacheMarker> = report
            .partition
            .healthy()
            .map(CacheMarker::healthy)
            .chain(report.partition.unhealthy().map(CacheMarker::unhealthy))
            .collect();

        for marker in markers {
            let Some(target) = topology.cache_target_for(&marker.address) else {
                debug!("No DynDNS entry for {}, skipping marker", marker.address);
                continue;
            };

            match writer.write_marker(&target, &marker).await {
                Ok(()) => report.markers_written += 1,
                Err(e) => {
                    error!("Could not write cache marker for {}: {}", marker.address, e);
                    report.marker_failures += 1;
                    self.emit_event(ReconcileEvent::MarkerFailed {
                        address: marker.address,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    async fn send_notification(&self, partition: &HealthPartition) -> bool {
        let Some(notifier) = self.notifier.as_deref() else {
            return false;
        };

        let body = change_body(&self.record.name, &partition.healthy_v4, &partition.healthy_v6);
        match notifier.notify(NOTIFY_SUBJECT, &body).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Notification via {} failed: {}",
                    notifier.notifier_name(),
                    e
                );
                false
            }
        }
    }

    fn enter(&self, phase: RunPhase) {
        debug!("Entering phase {}", phase);
        self.emit_event(ReconcileEvent::PhaseEntered { phase });
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        // Dropped rather than blocking the run when nobody drains the channel
        if self.event_tx.try_send(event).is_err() {
            debug!("Event channel full or closed, dropping event");
        }
    }
}

/// Unwrap a gathered fact, logging and substituting the empty value on error
fn or_empty<T: Default>(result: Result<T>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        warn!("Could not read {}: {}", what, e);
        T::default()
    })
}
