// # pfSense Platform Adapter
//
// This crate provides the pfSense implementation of `PlatformAdapter` plus a
// notifier that files pfSense system notices.
//
// ## Fact Sources
//
// - `config.xml`: thresholds, gateway → interface, interface assignments,
//   DynDNS entry ids and the IPv6 DynDNS check
// - dpinger status sockets: live latency/loss per gateway
// - `ifconfig`: configured addresses per physical interface
//
// ### Trust Level: Semi-Trusted (Platform Adapter)
//
// **Allowed Capabilities**:
// - ✅ Read config.xml and dpinger sockets
// - ✅ Run `ifconfig` (read-only)
//
// **Forbidden Capabilities**:
// - ❌ Write anything on the firewall (cache markers are owned by the reconciler)
// - ❌ Cache facts between calls; config.xml is re-read every time

pub mod config_xml;
pub mod dpinger;
pub mod ifconfig;
pub mod notice;

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::path::PathBuf;

use async_trait::async_trait;
use gwddns_core::config::PlatformConfig;
use gwddns_core::health::{ProbeReading, ThresholdConfig};
use gwddns_core::traits::{IpFamily, PlatformAdapter, PlatformFactory};
use gwddns_core::{Error, Result};

pub use config_xml::ConfigXml;
pub use ifconfig::{IfconfigParser, InterfaceAddress};
pub use notice::PfSenseNotifier;

const PLATFORM_NAME: &str = "pfsense";

/// pfSense platform adapter
#[derive(Debug)]
pub struct PfSenseAdapter {
    config_path: PathBuf,
    probe_dir: PathBuf,
    ifconfig_path: PathBuf,
    parser: IfconfigParser,
}

impl PfSenseAdapter {
    /// Create an adapter reading from the given locations
    ///
    /// Nothing is read until the first query.
    pub fn new(
        config_path: impl Into<PathBuf>,
        probe_dir: impl Into<PathBuf>,
        ifconfig_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            config_path: config_path.into(),
            probe_dir: probe_dir.into(),
            ifconfig_path: ifconfig_path.into(),
            parser: IfconfigParser::new()?,
        })
    }

    async fn config(&self) -> Result<ConfigXml> {
        let source = tokio::fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| {
                Error::platform(format!(
                    "Failed to read {}: {}",
                    self.config_path.display(),
                    e
                ))
            })?;
        ConfigXml::parse(&source)
    }

    async fn interface_addresses(&self) -> Result<Vec<InterfaceAddress>> {
        let output = ifconfig::run(&self.ifconfig_path).await?;
        Ok(self.parser.parse(&output))
    }
}

#[async_trait]
impl PlatformAdapter for PfSenseAdapter {
    async fn gateway_thresholds(&self) -> Result<ThresholdConfig> {
        Ok(self.config().await?.thresholds())
    }

    async fn gateway_probes(&self) -> Result<HashMap<String, ProbeReading>> {
        dpinger::read_probes(&self.probe_dir).await
    }

    async fn gateway_interfaces(&self) -> Result<HashMap<String, String>> {
        Ok(self.config().await?.gateway_interfaces())
    }

    async fn physical_to_logical(&self) -> Result<HashMap<String, String>> {
        Ok(self.config().await?.physical_to_logical())
    }

    async fn address_interfaces(&self) -> Result<HashMap<IpAddr, String>> {
        Ok(self
            .interface_addresses()
            .await?
            .into_iter()
            .map(|entry| (entry.address, entry.interface))
            .collect())
    }

    async fn interface_cache_ids(&self) -> Result<HashMap<String, String>> {
        Ok(self.config().await?.cache_ids())
    }

    async fn discover_addresses(
        &self,
        family: IpFamily,
        allowlist: &[String],
    ) -> Result<BTreeSet<IpAddr>> {
        let addresses: BTreeSet<IpAddr> = self
            .interface_addresses()
            .await?
            .into_iter()
            .filter(|entry| allowlist.is_empty() || allowlist.contains(&entry.interface))
            .map(|entry| entry.address)
            .filter(|address| family.matches(address) && ifconfig::is_public(address))
            .collect();

        tracing::debug!("Discovered {} public {} addresses", addresses.len(), family);
        Ok(addresses)
    }

    async fn ipv6_updates_configured(&self) -> Result<bool> {
        Ok(self.config().await?.ipv6_dyndns_configured())
    }

    fn platform_name(&self) -> &'static str {
        PLATFORM_NAME
    }
}

/// Factory for creating pfSense adapters
pub struct PfSenseFactory;

impl PlatformFactory for PfSenseFactory {
    fn create(&self, config: &PlatformConfig) -> Result<Box<dyn PlatformAdapter>> {
        match config {
            PlatformConfig::PfSense {
                config_path,
                probe_dir,
                ifconfig_path,
            } => Ok(Box::new(PfSenseAdapter::new(
                config_path,
                probe_dir,
                ifconfig_path,
            )?)),
            _ => Err(Error::config("Invalid config for pfSense platform")),
        }
    }
}

/// Register the pfSense platform with a registry
///
/// # Example
///
/// ```rust
/// use gwddns_core::Registry;
///
/// let registry = Registry::new();
/// gwddns_platform_pfsense::register(&registry);
/// assert!(registry.has_platform("pfsense"));
/// ```
pub fn register(registry: &gwddns_core::Registry) {
    registry.register_platform(PLATFORM_NAME, Box::new(PfSenseFactory));
}
