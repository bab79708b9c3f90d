//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles share their interior through `Arc`s, so a test keeps a handle
//! while the reconciler or watcher owns the boxed clone.

#![allow(dead_code)]

use gwddns_core::config::{GwddnsConfig, PublisherConfig, RecordConfig};
use gwddns_core::error::{Error, Result};
use gwddns_core::health::{ProbeReading, ThresholdConfig};
use gwddns_core::topology::CacheTarget;
use gwddns_core::traits::{
    CacheMarker, CacheWriter, DnsPublisher, IpFamily, Notifier, PlatformAdapter, ReplaceRequest,
    RunTrigger, TriggerRequest,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const WAN_V4: &str = "203.0.113.5";
pub const WAN_V6: &str = "2001:db8::5";
pub const OPT1_V4: &str = "198.51.100.7";
/// Lives on an interface no gateway is attached to
pub const ORPHAN_V4: &str = "192.0.2.44";

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test address")
}

/// Everything the fake platform reports
#[derive(Debug, Clone, Default)]
pub struct PlatformFacts {
    pub thresholds: ThresholdConfig,
    pub probes: HashMap<String, ProbeReading>,
    pub gateway_interfaces: HashMap<String, String>,
    pub physical_to_logical: HashMap<String, String>,
    pub address_interfaces: HashMap<IpAddr, String>,
    pub interface_cache_ids: HashMap<String, String>,
    pub addresses: BTreeSet<IpAddr>,
    pub ipv6_configured: bool,
    /// Method names that return an error
    pub failing: HashSet<&'static str>,
}

impl PlatformFacts {
    /// Two uplinks plus one address on a gateway-less interface
    ///
    /// - WAN_DHCP on wan (em0): 203.0.113.5, 2001:db8::5, entry id 0
    /// - OPT1_GW on opt1 (ixl2): 198.51.100.7, entry id 1
    /// - opt2 (igb3): 192.0.2.44, entry id 2, no gateway
    pub fn dual_wan() -> Self {
        let mut facts = Self {
            ipv6_configured: true,
            ..Self::default()
        };

        for (gateway, interface) in [("WAN_DHCP", "wan"), ("OPT1_GW", "opt1")] {
            facts
                .gateway_interfaces
                .insert(gateway.to_string(), interface.to_string());
        }
        for (physical, logical) in [("em0", "wan"), ("ixl2", "opt1"), ("igb3", "opt2")] {
            facts
                .physical_to_logical
                .insert(physical.to_string(), logical.to_string());
        }
        for (address, physical) in [
            (WAN_V4, "em0"),
            (WAN_V6, "em0"),
            (OPT1_V4, "ixl2"),
            (ORPHAN_V4, "igb3"),
        ] {
            facts.address_interfaces.insert(ip(address), physical.to_string());
            facts.addresses.insert(ip(address));
        }
        for (logical, id) in [("wan", "0"), ("opt1", "1"), ("opt2", "2")] {
            facts
                .interface_cache_ids
                .insert(logical.to_string(), id.to_string());
        }

        facts.probes.insert("WAN_DHCP".to_string(), ProbeReading::sample(12_000, 0));
        facts.probes.insert("OPT1_GW".to_string(), ProbeReading::sample(25_000, 0));
        facts
    }
}

/// A PlatformAdapter backed by mutable in-memory facts
#[derive(Clone)]
pub struct FakePlatform {
    facts: Arc<Mutex<PlatformFacts>>,
}

impl FakePlatform {
    pub fn new(facts: PlatformFacts) -> Self {
        Self {
            facts: Arc::new(Mutex::new(facts)),
        }
    }

    /// Mutate the facts seen by subsequent calls
    pub fn update(&self, change: impl FnOnce(&mut PlatformFacts)) {
        change(&mut *self.facts.lock().unwrap());
    }

    /// Replace one gateway's probe reading
    pub fn set_probe(&self, gateway: &str, reading: ProbeReading) {
        self.update(|facts| {
            facts.probes.insert(gateway.to_string(), reading);
        });
    }

    fn read<T>(&self, method: &'static str, get: impl FnOnce(&PlatformFacts) -> T) -> Result<T> {
        let facts = self.facts.lock().unwrap();
        if facts.failing.contains(method) {
            return Err(Error::platform(format!("{} unavailable", method)));
        }
        Ok(get(&*facts))
    }
}

#[async_trait::async_trait]
impl PlatformAdapter for FakePlatform {
    async fn gateway_thresholds(&self) -> Result<ThresholdConfig> {
        self.read("gateway_thresholds", |f| f.thresholds.clone())
    }

    async fn gateway_probes(&self) -> Result<HashMap<String, ProbeReading>> {
        self.read("gateway_probes", |f| f.probes.clone())
    }

    async fn gateway_interfaces(&self) -> Result<HashMap<String, String>> {
        self.read("gateway_interfaces", |f| f.gateway_interfaces.clone())
    }

    async fn physical_to_logical(&self) -> Result<HashMap<String, String>> {
        self.read("physical_to_logical", |f| f.physical_to_logical.clone())
    }

    async fn address_interfaces(&self) -> Result<HashMap<IpAddr, String>> {
        self.read("address_interfaces", |f| f.address_interfaces.clone())
    }

    async fn interface_cache_ids(&self) -> Result<HashMap<String, String>> {
        self.read("interface_cache_ids", |f| f.interface_cache_ids.clone())
    }

    async fn discover_addresses(
        &self,
        family: IpFamily,
        allowlist: &[String],
    ) -> Result<BTreeSet<IpAddr>> {
        self.read("discover_addresses", |f| {
            f.addresses
                .iter()
                .filter(|a| family.matches(a))
                .filter(|a| {
                    allowlist.is_empty()
                        || f.address_interfaces
                            .get(*a)
                            .is_some_and(|interface| allowlist.contains(interface))
                })
                .copied()
                .collect()
        })
    }

    async fn ipv6_updates_configured(&self) -> Result<bool> {
        self.read("ipv6_updates_configured", |f| f.ipv6_configured)
    }

    fn platform_name(&self) -> &'static str {
        "fake"
    }
}

/// A DnsPublisher that records every request
#[derive(Clone, Default)]
pub struct MockPublisher {
    requests: Arc<Mutex<Vec<ReplaceRequest>>>,
    fail: Arc<Mutex<bool>>,
    delay: Arc<Mutex<Duration>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }

    /// Hold every call open for `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ReplaceRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<ReplaceRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl DnsPublisher for MockPublisher {
    async fn replace_records(&self, request: &ReplaceRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.fail.lock().unwrap() {
            return Err(Error::provider("mock", "HTTP 500"));
        }
        Ok(())
    }

    fn publisher_name(&self) -> &'static str {
        "mock"
    }
}

/// A CacheWriter that records markers instead of writing files
#[derive(Clone, Default)]
pub struct RecordingCacheWriter {
    written: Arc<Mutex<Vec<(CacheTarget, CacheMarker)>>>,
    failing: Arc<Mutex<HashSet<IpAddr>>>,
}

impl RecordingCacheWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write for `address`
    pub fn fail_for(&self, address: IpAddr) {
        self.failing.lock().unwrap().insert(address);
    }

    pub fn written(&self) -> Vec<(CacheTarget, CacheMarker)> {
        self.written.lock().unwrap().clone()
    }

    /// Marker content written for `address`, if any
    pub fn content_for(&self, address: IpAddr) -> Option<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, marker)| marker.address == address)
            .map(|(_, marker)| marker.content())
    }
}

#[async_trait::async_trait]
impl CacheWriter for RecordingCacheWriter {
    fn marker_path(&self, target: &CacheTarget) -> PathBuf {
        PathBuf::from(format!("{}-{}", target.logical_interface, target.entry_id))
    }

    async fn write_marker(&self, target: &CacheTarget, marker: &CacheMarker) -> Result<()> {
        if self.failing.lock().unwrap().contains(&marker.address) {
            return Err(Error::cache("disk full"));
        }
        self.written
            .lock()
            .unwrap()
            .push((target.clone(), *marker));
        Ok(())
    }
}

/// A Notifier that records (subject, body) pairs
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        if self.fail {
            return Err(Error::notify("notice queue unavailable"));
        }
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// A RunTrigger that records requests
#[derive(Clone, Default)]
pub struct RecordingTrigger {
    requests: Arc<Mutex<Vec<TriggerRequest>>>,
    fail: bool,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<TriggerRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RunTrigger for RecordingTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(Error::Other("reconciler binary missing".to_string()));
        }
        Ok(())
    }
}

/// Minimal valid configuration for home.example.org.
pub fn minimal_config() -> GwddnsConfig {
    GwddnsConfig::new(
        RecordConfig::new("example.org.", "home.example.org."),
        PublisherConfig::PowerDns {
            api_url: "https://pdns.test/api/v1".to_string(),
            api_key: "test-key".to_string(),
            server_id: "localhost".to_string(),
        },
    )
}

/// A reconciler wired to the given doubles, with cache markers and notifier
pub struct Harness {
    pub reconciler: gwddns_core::Reconciler,
    pub events: tokio::sync::mpsc::Receiver<gwddns_core::ReconcileEvent>,
    pub platform: FakePlatform,
    pub publisher: MockPublisher,
    pub cache: RecordingCacheWriter,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new(
        facts: PlatformFacts,
        state_store: Box<dyn gwddns_core::StateStore>,
    ) -> Self {
        Self::with_notifier(facts, state_store, RecordingNotifier::new())
    }

    pub fn with_notifier(
        facts: PlatformFacts,
        state_store: Box<dyn gwddns_core::StateStore>,
        notifier: RecordingNotifier,
    ) -> Self {
        let platform = FakePlatform::new(facts);
        let publisher = MockPublisher::new();
        let cache = RecordingCacheWriter::new();

        let (reconciler, events) = gwddns_core::Reconciler::new(
            Box::new(platform.clone()),
            Box::new(publisher.clone()),
            state_store,
            Some(Box::new(cache.clone())),
            Some(Box::new(notifier.clone())),
            &minimal_config(),
        )
        .expect("reconciler construction succeeds");

        Self {
            reconciler,
            events,
            platform,
            publisher,
            cache,
            notifier,
        }
    }

    /// Drain every event emitted so far
    pub fn drain_events(&mut self) -> Vec<gwddns_core::ReconcileEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
