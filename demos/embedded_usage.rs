//! Minimal embedding example for gwddns-core
//!
//! This example demonstrates using gwddns-core as a library in a custom
//! application: a simulated dual-WAN host, a printing DNS publisher, an
//! in-memory state store and a watcher that triggers runs in-process.

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gwddns_core::config::{PublisherConfig, RecordConfig, StateStoreConfig};
use gwddns_core::health::{ProbeReading, ThresholdConfig};
use gwddns_core::traits::{
    DnsPublisher, IpFamily, PlatformAdapter, ReplaceRequest, RunTrigger, TriggerRequest,
};
use gwddns_core::{
    Error, FamilyFilter, GatewayWatcher, GwddnsConfig, LogNotifier, MemoryStateStore, Reconciler,
    Result, RunOptions,
};

/// Two uplinks: WAN_DHCP on em0 and OPT1_GW on ixl2
#[derive(Clone)]
struct EmbeddedPlatform {
    probes: Arc<Mutex<HashMap<String, ProbeReading>>>,
}

impl EmbeddedPlatform {
    fn new() -> Self {
        let probes = HashMap::from([
            ("WAN_DHCP".to_string(), ProbeReading::sample(12_000, 0)),
            ("OPT1_GW".to_string(), ProbeReading::sample(25_000, 0)),
        ]);
        Self {
            probes: Arc::new(Mutex::new(probes)),
        }
    }

    /// Simulate a probe change
    fn set_probe(&self, gateway: &str, reading: ProbeReading) {
        if let Ok(mut probes) = self.probes.lock() {
            probes.insert(gateway.to_string(), reading);
        }
    }
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap_or(IpAddr::from([0, 0, 0, 0]))
}

#[async_trait]
impl PlatformAdapter for EmbeddedPlatform {
    async fn gateway_thresholds(&self) -> Result<ThresholdConfig> {
        Ok(ThresholdConfig::default())
    }

    async fn gateway_probes(&self) -> Result<HashMap<String, ProbeReading>> {
        self.probes
            .lock()
            .map(|probes| probes.clone())
            .map_err(|_| Error::platform("probe table poisoned"))
    }

    async fn gateway_interfaces(&self) -> Result<HashMap<String, String>> {
        Ok(HashMap::from([
            ("WAN_DHCP".to_string(), "wan".to_string()),
            ("OPT1_GW".to_string(), "opt1".to_string()),
        ]))
    }

    async fn physical_to_logical(&self) -> Result<HashMap<String, String>> {
        Ok(HashMap::from([
            ("em0".to_string(), "wan".to_string()),
            ("ixl2".to_string(), "opt1".to_string()),
        ]))
    }

    async fn address_interfaces(&self) -> Result<HashMap<IpAddr, String>> {
        Ok(HashMap::from([
            (ip("203.0.113.5"), "em0".to_string()),
            (ip("2001:db8::5"), "em0".to_string()),
            (ip("198.51.100.7"), "ixl2".to_string()),
        ]))
    }

    async fn interface_cache_ids(&self) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }

    async fn discover_addresses(
        &self,
        family: IpFamily,
        _allowlist: &[String],
    ) -> Result<BTreeSet<IpAddr>> {
        Ok(self
            .address_interfaces()
            .await?
            .into_keys()
            .filter(|address| family.matches(address))
            .collect())
    }

    async fn ipv6_updates_configured(&self) -> Result<bool> {
        Ok(true)
    }

    fn platform_name(&self) -> &'static str {
        "embedded"
    }
}

/// Publisher that prints instead of calling an API
struct PrintingPublisher;

#[async_trait]
impl DnsPublisher for PrintingPublisher {
    async fn replace_records(&self, request: &ReplaceRequest) -> Result<()> {
        println!(
            "[Publisher] {} A={:?} AAAA={:?}",
            request.record_name, request.a, request.aaaa
        );
        Ok(())
    }

    fn publisher_name(&self) -> &'static str {
        "printing"
    }
}

/// Runs the reconciler in-process instead of spawning a binary
struct InProcessTrigger {
    reconciler: Arc<Reconciler>,
}

#[async_trait]
impl RunTrigger for InProcessTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> Result<()> {
        let options = RunOptions {
            force_update: request.force_update,
            family: if request.ipv4_only {
                FamilyFilter::V4Only
            } else {
                FamilyFilter::Both
            },
            reason: request.reason.clone(),
            dry_run: false,
        };
        let report = self.reconciler.run(&options).await?;
        println!("[Trigger] {} run finished: {:?}", request.reason, report.outcome);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded gwddns-core Example ===\n");

    let platform = EmbeddedPlatform::new();

    let mut config = GwddnsConfig::new(
        RecordConfig::new("example.org.", "home.example.org."),
        PublisherConfig::Custom {
            factory: "printing".to_string(),
            config: serde_json::json!({}),
        },
    );
    config.state_store = StateStoreConfig::Memory;

    println!("1. Creating reconciler...");
    let (reconciler, mut event_rx) = Reconciler::new(
        Box::new(platform.clone()),
        Box::new(PrintingPublisher),
        Box::new(MemoryStateStore::new()),
        None,
        Some(Box::new(LogNotifier)),
        &config,
    )?;
    let reconciler = Arc::new(reconciler);

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("\n2. Scheduled run: both gateways healthy");
    let report = reconciler.run(&RunOptions::default()).await?;
    println!("   Outcome: {:?}", report.outcome);

    println!("\n3. Second run: nothing changed, nothing published");
    let report = reconciler.run(&RunOptions::default()).await?;
    println!("   Outcome: {:?}", report.outcome);

    println!("\n4. Watcher sees WAN_DHCP lose packets");
    let watcher = GatewayWatcher::new(
        Box::new(platform.clone()),
        Box::new(InProcessTrigger {
            reconciler: Arc::clone(&reconciler),
        }),
        config.health,
    );
    watcher.prime().await;
    platform.set_probe("WAN_DHCP", ProbeReading::sample(12_000, 40));
    let triggered = watcher.poll_once().await;
    println!("   Triggered: {}", triggered);

    drop(watcher);
    drop(reconciler);
    let _ = tokio::time::timeout(tokio::time::Duration::from_millis(100), event_listener).await;

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Reconciler and watcher lifecycles are fully controlled by the application");
    println!("- Platform, publisher and state store are custom implementations");
    println!("- Only addresses behind healthy gateways end up in DNS");

    Ok(())
}
