//! Contract Test: Health-Driven Reconciliation
//!
//! Constraints verified:
//! - Only addresses behind an online gateway are published
//! - Every classified address with a DynDNS entry gets a marker; unhealthy
//!   ones carry the trailing newline
//! - Family filters restrict both the publish and the markers
//! - Publish failure leaves state, markers and notifications untouched
//! - Data-source, marker and notification failures never abort a run
//!
//! If this test fails, the publish decision or its side effects are wrong.

mod common;

use common::*;
use gwddns_core::config::HealthPolicy;
use gwddns_core::engine::RunPhase;
use gwddns_core::error::{Error, Result};
use gwddns_core::health::ProbeReading;
use gwddns_core::state::MemoryStateStore;
use gwddns_core::traits::{PersistedState, StateStore};
use gwddns_core::{FamilyFilter, ReconcileEvent, RunOptions, RunOutcome};
use std::net::{Ipv4Addr, Ipv6Addr};

fn v4(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn v6(s: &str) -> Ipv6Addr {
    s.parse().unwrap()
}

#[tokio::test]
async fn publishes_only_addresses_behind_online_gateways() {
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));

    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Published);

    let request = harness.publisher.last_request().unwrap();
    assert_eq!(request.zone, "example.org.");
    assert_eq!(request.record_name, "home.example.org.");
    assert_eq!(request.ttl, 60);
    // Sorted, orphan excluded
    assert_eq!(request.a, vec![v4(OPT1_V4), v4(WAN_V4)]);
    assert_eq!(request.aaaa, vec![v6(WAN_V6)]);

    assert!(report.partition.unhealthy_v4.contains(&v4(ORPHAN_V4)));
}

#[tokio::test]
async fn gateway_going_down_removes_its_addresses() {
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));
    harness.reconciler.run(&RunOptions::default()).await.unwrap();

    // 600 ms is above the 500 ms default ceiling
    harness
        .platform
        .set_probe("OPT1_GW", ProbeReading::sample(600_000, 0));

    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Published);
    assert_eq!(harness.publisher.call_count(), 2);
    assert_eq!(harness.publisher.last_request().unwrap().a, vec![v4(WAN_V4)]);
    assert_eq!(
        harness.cache.content_for(ip(OPT1_V4)).as_deref(),
        Some("198.51.100.7\n")
    );
}

#[tokio::test]
async fn platform_thresholds_are_honored() {
    let mut facts = PlatformFacts::dual_wan();
    facts.thresholds.defaults.latency_high_ms = Some(20);

    let harness = Harness::new(facts, Box::new(MemoryStateStore::new()));
    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    // WAN_DHCP at 12 ms stays online, OPT1_GW at 25 ms is down
    assert_eq!(report.partition.healthy_v4.iter().copied().collect::<Vec<_>>(), vec![v4(WAN_V4)]);
    assert!(report.partition.unhealthy_v4.contains(&v4(OPT1_V4)));
}

#[tokio::test]
async fn invalid_probe_marks_gateway_down() {
    let mut facts = PlatformFacts::dual_wan();
    facts
        .probes
        .insert("OPT1_GW".to_string(), ProbeReading::invalid("3 fields"));

    let harness = Harness::new(facts, Box::new(MemoryStateStore::new()));
    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert!(report.partition.unhealthy_v4.contains(&v4(OPT1_V4)));
}

#[tokio::test]
async fn unprobed_gateway_is_unhealthy() {
    let mut facts = PlatformFacts::dual_wan();
    facts.probes.remove("WAN_DHCP");

    let harness = Harness::new(facts, Box::new(MemoryStateStore::new()));
    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert!(report.partition.healthy_v6.is_empty());
    assert!(report.partition.unhealthy_v4.contains(&v4(WAN_V4)));
    assert!(report.partition.unhealthy_v6.contains(&v6(WAN_V6)));
}

#[tokio::test]
async fn markers_reflect_health() {
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));

    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert_eq!(report.markers_written, 4);
    assert_eq!(report.marker_failures, 0);
    assert_eq!(harness.cache.content_for(ip(WAN_V4)).as_deref(), Some(WAN_V4));
    assert_eq!(harness.cache.content_for(ip(OPT1_V4)).as_deref(), Some(OPT1_V4));
    // No gateway on opt2, but the entry id still resolves
    assert_eq!(
        harness.cache.content_for(ip(ORPHAN_V4)).as_deref(),
        Some("192.0.2.44\n")
    );

    let orphan_target = harness
        .cache
        .written()
        .into_iter()
        .find(|(_, marker)| marker.address == ip(ORPHAN_V4))
        .map(|(target, _)| target)
        .unwrap();
    assert_eq!(orphan_target.logical_interface, "opt2");
    assert_eq!(orphan_target.entry_id, "2");
}

#[tokio::test]
async fn address_without_entry_id_gets_no_marker() {
    let mut facts = PlatformFacts::dual_wan();
    facts.interface_cache_ids.remove("opt1");

    let harness = Harness::new(facts, Box::new(MemoryStateStore::new()));
    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert_eq!(report.markers_written, 3);
    assert_eq!(harness.cache.content_for(ip(OPT1_V4)), None);
}

#[tokio::test]
async fn ipv4_only_restricts_publish_and_markers() {
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));

    let options = RunOptions {
        family: FamilyFilter::V4Only,
        ..RunOptions::default()
    };
    let report = harness.reconciler.run(&options).await.unwrap();

    let request = harness.publisher.last_request().unwrap();
    assert_eq!(request.a.len(), 2);
    assert!(request.aaaa.is_empty());
    assert!(report.partition.healthy_v6.is_empty());
    assert!(report.partition.unhealthy_v6.is_empty());
    assert_eq!(harness.cache.content_for(ip(WAN_V6)), None);
}

#[tokio::test]
async fn ipv6_only_restricts_publish_and_markers() {
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));

    let options = RunOptions {
        family: FamilyFilter::V6Only,
        ..RunOptions::default()
    };
    let report = harness.reconciler.run(&options).await.unwrap();

    let request = harness.publisher.last_request().unwrap();
    assert!(request.a.is_empty());
    assert_eq!(request.aaaa, vec![v6(WAN_V6)]);
    assert_eq!(report.markers_written, 1);
}

#[tokio::test]
async fn dry_run_has_no_side_effects() {
    let store = MemoryStateStore::new();
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(store.clone()));

    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };
    let report = harness.reconciler.run(&options).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::DryRun);
    assert!(report.is_success());
    assert_eq!(harness.publisher.call_count(), 0);
    assert!(store.snapshot().await.is_empty());
    assert!(harness.cache.written().is_empty());
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn publish_failure_persists_nothing() {
    let store = MemoryStateStore::new();
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(store.clone()));
    harness.publisher.set_failing(true);

    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert!(matches!(report.outcome, RunOutcome::PublishFailed { .. }));
    assert!(!report.is_success());
    assert!(!report.state_saved);
    assert_eq!(harness.publisher.call_count(), 1, "No retries within a run");
    assert!(store.snapshot().await.is_empty());
    assert!(harness.cache.written().is_empty());
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn next_run_after_publish_failure_retries_same_delta() {
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));

    harness.publisher.set_failing(true);
    harness.reconciler.run(&RunOptions::default()).await.unwrap();

    harness.publisher.set_failing(false);
    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Published);
    let requests = harness.publisher.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
}

#[tokio::test]
async fn missing_address_map_makes_everything_unhealthy() {
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));
    harness.reconciler.run(&RunOptions::default()).await.unwrap();

    harness.platform.update(|facts| {
        facts.failing.insert("address_interfaces");
    });
    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Published);
    let request = harness.publisher.last_request().unwrap();
    assert!(request.a.is_empty());
    assert!(request.aaaa.is_empty());
    // Without the address map no marker target resolves either
    assert_eq!(report.markers_written, 0);
}

#[tokio::test]
async fn missing_probe_data_makes_everything_unhealthy() {
    let mut facts = PlatformFacts::dual_wan();
    facts.failing.insert("gateway_probes");

    let harness = Harness::new(facts, Box::new(MemoryStateStore::new()));
    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert!(report.partition.healthy().next().is_none());
    assert_eq!(report.partition.unhealthy().count(), 4);
}

#[tokio::test]
async fn marker_failure_does_not_abort_run() {
    let mut harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));
    harness.cache.fail_for(ip(WAN_V4));

    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Published);
    assert_eq!(report.marker_failures, 1);
    assert_eq!(report.markers_written, 3);
    assert!(report.state_saved);
    assert!(report.notified);

    let events = harness.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        ReconcileEvent::MarkerFailed { address, .. } if *address == ip(WAN_V4)
    )));
}

#[tokio::test]
async fn notification_failure_is_ignored() {
    let harness = Harness::with_notifier(
        PlatformFacts::dual_wan(),
        Box::new(MemoryStateStore::new()),
        RecordingNotifier::failing(),
    );

    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Published);
    assert!(report.is_success());
    assert!(!report.notified);
    assert_eq!(harness.notifier.sent().len(), 1);
}

#[tokio::test]
async fn notification_summarizes_healthy_sets() {
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));
    harness.reconciler.run(&RunOptions::default()).await.unwrap();

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "DynDNS Gateway Update");
    assert_eq!(
        sent[0].1,
        "DynDNS for home.example.org. updated.\nHealthy IPs:\nIPv4: 198.51.100.7, 203.0.113.5\nIPv6: 2001:db8::5"
    );
}

#[tokio::test]
async fn phases_are_emitted_in_order() {
    let mut harness = Harness::new(PlatformFacts::dual_wan(), Box::new(MemoryStateStore::new()));
    harness.reconciler.run(&RunOptions::default()).await.unwrap();

    let phases: Vec<RunPhase> = harness
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            ReconcileEvent::PhaseEntered { phase } => Some(phase),
            _ => None,
        })
        .collect();

    assert_eq!(
        phases,
        vec![
            RunPhase::Gathering,
            RunPhase::Classifying,
            RunPhase::Deciding,
            RunPhase::Publishing,
            RunPhase::Persisting,
            RunPhase::CacheWriting,
            RunPhase::Notifying,
            RunPhase::Idle,
        ]
    );
}

struct BrokenStateStore;

#[async_trait::async_trait]
impl StateStore for BrokenStateStore {
    async fn load(&self) -> Result<PersistedState> {
        Err(Error::state_store("permission denied"))
    }

    async fn save(&self, _state: &PersistedState) -> Result<()> {
        Err(Error::state_store("read-only filesystem"))
    }
}

#[tokio::test]
async fn unreadable_state_is_treated_as_never_published() {
    let harness = Harness::new(PlatformFacts::dual_wan(), Box::new(BrokenStateStore));

    let report = harness.reconciler.run(&RunOptions::default()).await.unwrap();

    // Published, but the save failure is reported without undoing it
    assert_eq!(report.outcome, RunOutcome::Published);
    assert!(!report.state_saved);
    assert_eq!(report.markers_written, 4);
}

#[tokio::test]
async fn zero_loss_policy_is_applied() {
    let mut facts = PlatformFacts::dual_wan();
    facts
        .probes
        .insert("OPT1_GW".to_string(), ProbeReading::sample(25_000, 1));

    let platform = FakePlatform::new(facts);
    let publisher = MockPublisher::new();
    let mut config = minimal_config();
    config.health = HealthPolicy {
        require_zero_loss: true,
        ..HealthPolicy::default()
    };

    let (reconciler, _events) = gwddns_core::Reconciler::new(
        Box::new(platform),
        Box::new(publisher.clone()),
        Box::new(MemoryStateStore::new()),
        None,
        None,
        &config,
    )
    .unwrap();

    let report = reconciler.run(&RunOptions::default()).await.unwrap();

    assert!(report.partition.unhealthy_v4.contains(&v4(OPT1_V4)));
    assert_eq!(report.markers_written, 0, "Cache writer disabled");
    assert!(!report.notified, "Notifier disabled");
    assert_eq!(publisher.last_request().unwrap().a, vec![v4(WAN_V4)]);
}
