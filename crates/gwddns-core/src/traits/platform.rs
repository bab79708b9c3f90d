// # Platform Adapter Trait
//
// Defines the interface through which the reconciler learns raw facts about
// the host: gateway thresholds and probe readings, the interface topology,
// and the public addresses currently configured.
//
// ## Implementations
//
// - pfSense: `gwddns-platform-pfsense` crate
// - Future: OPNsense, OpenWrt, container network stacks, cloud metadata APIs
//
// ## Usage
//
// ```rust,ignore
// use gwddns_core::traits::{IpFamily, PlatformAdapter};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let adapter = /* PlatformAdapter implementation */;
//
//     let probes = adapter.gateway_probes().await?;
//     let v4 = adapter.discover_addresses(IpFamily::V4, &[]).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::net::IpAddr;

use crate::health::{ProbeReading, ThresholdConfig};

/// Address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Whether `address` belongs to this family
    pub fn matches(&self, address: &IpAddr) -> bool {
        match self {
            IpFamily::V4 => address.is_ipv4(),
            IpFamily::V6 => address.is_ipv6(),
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Trait for platform adapter implementations
///
/// Every method is an independent, read-only query. The reconciler calls
/// them concurrently and treats each failure in isolation: a failing method
/// degrades to an empty value for that one fact and the run continues.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Read platform configuration files
/// - ✅ Read probe sockets or status files
/// - ✅ Run read-only OS commands (e.g. `ifconfig`)
///
/// ## Forbidden Capabilities
/// - ❌ Publish DNS records (use `DnsPublisher`)
/// - ❌ Write state or cache markers (owned by `Reconciler`)
/// - ❌ Classify health (owned by the `health` module)
/// - ❌ Cache results between calls; thresholds may change live
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Threshold configuration: platform defaults plus per-gateway settings
    async fn gateway_thresholds(&self) -> Result<ThresholdConfig, crate::Error>;

    /// Live probe reading per probed gateway
    ///
    /// Gateways without a probe source are absent. A probe that exists but
    /// yields unusable output is reported as [`ProbeReading::Invalid`].
    async fn gateway_probes(&self) -> Result<HashMap<String, ProbeReading>, crate::Error>;

    /// gateway name → logical interface
    async fn gateway_interfaces(&self) -> Result<HashMap<String, String>, crate::Error>;

    /// physical interface → logical interface
    async fn physical_to_logical(&self) -> Result<HashMap<String, String>, crate::Error>;

    /// address → physical interface, covering every configured address
    async fn address_interfaces(&self) -> Result<HashMap<IpAddr, String>, crate::Error>;

    /// logical interface → DynDNS entry id
    async fn interface_cache_ids(&self) -> Result<HashMap<String, String>, crate::Error>;

    /// Public addresses of `family` on the allowed physical interfaces
    ///
    /// An empty allowlist means every interface.
    async fn discover_addresses(
        &self,
        family: IpFamily,
        allowlist: &[String],
    ) -> Result<BTreeSet<IpAddr>, crate::Error>;

    /// Whether an IPv6-capable DynDNS update channel is configured
    async fn ipv6_updates_configured(&self) -> Result<bool, crate::Error>;

    /// Platform name (for logging/debugging)
    fn platform_name(&self) -> &'static str;
}

/// Helper trait for constructing platform adapters from configuration
pub trait PlatformFactory: Send + Sync {
    /// Create a PlatformAdapter instance from configuration
    fn create(
        &self,
        config: &crate::config::PlatformConfig,
    ) -> Result<Box<dyn PlatformAdapter>, crate::Error>;
}
