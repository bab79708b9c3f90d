//! Gateway health classification
//!
//! Turns raw probe readings and latency/loss thresholds into a per-gateway
//! [`GatewayStatus`]. Classification is a pure function of its inputs; the
//! only I/O here is [`gateway_statuses`], which pulls thresholds and probe
//! readings from a [`PlatformAdapter`] and degrades failures to empty maps.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, warn};

use crate::config::HealthPolicy;
use crate::traits::PlatformAdapter;

/// Resolved latency/loss ceilings for one gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayThresholds {
    /// Latency ceiling in milliseconds (exclusive)
    pub latency_high_ms: u32,
    /// Loss ceiling in percent (exclusive)
    pub loss_high_pct: u32,
}

impl GatewayThresholds {
    /// Thresholds taken straight from a policy's defaults
    pub fn from_policy(policy: &HealthPolicy) -> Self {
        Self {
            latency_high_ms: policy.default_latency_high_ms,
            loss_high_pct: policy.default_loss_high_pct,
        }
    }
}

/// Threshold fields as configured on the platform; absent fields inherit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThresholdOverride {
    pub latency_high_ms: Option<u32>,
    pub loss_high_pct: Option<u32>,
}

/// Threshold configuration as read from the platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThresholdConfig {
    /// Platform-wide defaults (e.g. the firewall's global gateway settings)
    pub defaults: ThresholdOverride,
    /// Per-gateway settings
    pub gateways: HashMap<String, ThresholdOverride>,
}

impl ThresholdConfig {
    /// Resolve the thresholds for `gateway`
    ///
    /// Each field falls back independently: gateway setting, then platform
    /// default, then the policy default.
    pub fn resolve(&self, gateway: &str, policy: &HealthPolicy) -> GatewayThresholds {
        let own = self.gateways.get(gateway).copied().unwrap_or_default();
        GatewayThresholds {
            latency_high_ms: own
                .latency_high_ms
                .or(self.defaults.latency_high_ms)
                .unwrap_or(policy.default_latency_high_ms),
            loss_high_pct: own
                .loss_high_pct
                .or(self.defaults.loss_high_pct)
                .unwrap_or(policy.default_loss_high_pct),
        }
    }
}

/// One live latency/loss sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySample {
    pub latency_us: u64,
    pub loss_pct: u32,
}

/// What a gateway's probe source produced this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReading {
    /// A well-formed sample
    Sample(GatewaySample),
    /// The probe exists but its output could not be used
    Invalid { reason: String },
}

impl ProbeReading {
    pub fn sample(latency_us: u64, loss_pct: u32) -> Self {
        Self::Sample(GatewaySample {
            latency_us,
            loss_pct,
        })
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Gateway health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayStatus {
    Online,
    Down,
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayStatus::Online => f.write_str("online"),
            GatewayStatus::Down => f.write_str("down"),
        }
    }
}

/// Why a gateway was classified down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownReason {
    /// Latency at or above the ceiling
    LatencyExceeded,
    /// Loss at or above the ceiling
    LossExceeded,
    /// Non-zero loss while the policy requires zero loss
    LossNotZero,
    /// The probe output was malformed or unreadable
    InvalidSample,
}

/// Classification result for one gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayVerdict {
    pub status: GatewayStatus,
    pub reason: Option<DownReason>,
}

impl GatewayVerdict {
    fn online() -> Self {
        Self {
            status: GatewayStatus::Online,
            reason: None,
        }
    }

    fn down(reason: DownReason) -> Self {
        Self {
            status: GatewayStatus::Down,
            reason: Some(reason),
        }
    }
}

/// Status per probed gateway, ordered by name
///
/// A gateway missing from the map is equivalent to [`GatewayStatus::Down`].
pub type GatewayStatusMap = BTreeMap<String, GatewayStatus>;

/// Whether `gateway` is online according to `statuses`
pub fn is_online(statuses: &GatewayStatusMap, gateway: &str) -> bool {
    statuses.get(gateway) == Some(&GatewayStatus::Online)
}

/// Classify one gateway
///
/// Bounds are exclusive: a sample equal to a ceiling is down.
pub fn classify(
    thresholds: &GatewayThresholds,
    reading: &ProbeReading,
    policy: &HealthPolicy,
) -> GatewayVerdict {
    let sample = match reading {
        ProbeReading::Sample(sample) => sample,
        ProbeReading::Invalid { .. } => return GatewayVerdict::down(DownReason::InvalidSample),
    };

    if policy.require_zero_loss && sample.loss_pct != 0 {
        return GatewayVerdict::down(DownReason::LossNotZero);
    }

    // latency_us / 1000 < latency_high_ms without truncating the division
    if sample.latency_us >= u64::from(thresholds.latency_high_ms) * 1000 {
        return GatewayVerdict::down(DownReason::LatencyExceeded);
    }

    if sample.loss_pct >= thresholds.loss_high_pct {
        return GatewayVerdict::down(DownReason::LossExceeded);
    }

    GatewayVerdict::online()
}

/// Classify every gateway in `probes`
///
/// Gateways with thresholds but no probe reading are left out.
pub fn classify_all(
    thresholds: &ThresholdConfig,
    probes: &HashMap<String, ProbeReading>,
    policy: &HealthPolicy,
) -> GatewayStatusMap {
    let mut statuses = GatewayStatusMap::new();

    for (gateway, reading) in probes {
        let resolved = thresholds.resolve(gateway, policy);
        let verdict = classify(&resolved, reading, policy);

        match (verdict.reason, reading) {
            (Some(DownReason::InvalidSample), ProbeReading::Invalid { reason }) => {
                warn!("Could not use probe for gateway {}, assuming down: {}", gateway, reason);
            }
            (Some(reason), _) => {
                debug!(
                    "Gateway {} down ({:?}, thresholds {}ms/{}%)",
                    gateway, reason, resolved.latency_high_ms, resolved.loss_high_pct
                );
            }
            (None, _) => {
                debug!("Gateway {} online", gateway);
            }
        }

        statuses.insert(gateway.clone(), verdict.status);
    }

    statuses
}

/// Read thresholds and probes from the platform and classify all gateways
///
/// Read failures are logged and treated as empty input, so a broken probe
/// source yields an empty map rather than an error.
pub async fn gateway_statuses(
    adapter: &dyn PlatformAdapter,
    policy: &HealthPolicy,
) -> GatewayStatusMap {
    let (thresholds, probes) = tokio::join!(adapter.gateway_thresholds(), adapter.gateway_probes());

    let thresholds = thresholds.unwrap_or_else(|e| {
        warn!("Could not read gateway thresholds: {}", e);
        ThresholdConfig::default()
    });
    let probes = probes.unwrap_or_else(|e| {
        warn!("Could not read gateway probes: {}", e);
        HashMap::new()
    });

    classify_all(&thresholds, &probes, policy)
}
