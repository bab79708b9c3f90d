//! Gateway / interface / address topology
//!
//! The platform hands over four independent maps. [`Topology`] chains them so
//! that an address can be traced to the gateway that carries its traffic and
//! to the DynDNS entry whose cache marker reflects it:
//!
//! ```text
//! address ──▶ physical if ──▶ logical if ──▶ gateway      (inverse of gateway → if)
//!                                   └─────▶ entry id
//! ```
//!
//! A missing link anywhere yields `None`; resolution never fails.

use std::collections::HashMap;
use std::net::IpAddr;

use tracing::warn;

/// Raw topology maps as read from the platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyMaps {
    /// gateway name → logical interface
    pub gateway_interfaces: HashMap<String, String>,
    /// physical interface → logical interface
    pub physical_to_logical: HashMap<String, String>,
    /// address → physical interface
    pub address_interfaces: HashMap<IpAddr, String>,
    /// logical interface → DynDNS entry id
    pub interface_cache_ids: HashMap<String, String>,
}

/// Where an address's cache marker lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheTarget {
    pub logical_interface: String,
    pub entry_id: String,
}

/// Resolved topology for one reconciliation run
#[derive(Debug, Clone)]
pub struct Topology {
    maps: TopologyMaps,
    interface_gateways: HashMap<String, String>,
}

impl Topology {
    /// Build the resolver, inverting the gateway → interface map
    ///
    /// If several gateways sit on the same logical interface, the
    /// lexicographically smallest name wins.
    pub fn new(maps: TopologyMaps) -> Self {
        let mut gateways: Vec<(&String, &String)> = maps.gateway_interfaces.iter().collect();
        gateways.sort();

        let mut interface_gateways: HashMap<String, String> = HashMap::new();
        for (gateway, interface) in gateways {
            if let Some(existing) = interface_gateways.get(interface) {
                warn!(
                    "Gateways {} and {} share interface {}; using {}",
                    existing, gateway, interface, existing
                );
                continue;
            }
            interface_gateways.insert(interface.clone(), gateway.clone());
        }

        Self {
            maps,
            interface_gateways,
        }
    }

    /// Logical interface an address is configured on
    pub fn logical_interface_for(&self, address: &IpAddr) -> Option<&str> {
        let physical = self.maps.address_interfaces.get(address)?;
        self.maps
            .physical_to_logical
            .get(physical)
            .map(String::as_str)
    }

    /// Gateway that carries traffic for `address`
    pub fn gateway_for(&self, address: &IpAddr) -> Option<&str> {
        let logical = self.logical_interface_for(address)?;
        self.interface_gateways.get(logical).map(String::as_str)
    }

    /// Cache marker location for `address`
    ///
    /// Does not depend on a gateway being resolvable.
    pub fn cache_target_for(&self, address: &IpAddr) -> Option<CacheTarget> {
        let logical = self.logical_interface_for(address)?;
        let entry_id = self.maps.interface_cache_ids.get(logical)?;
        Some(CacheTarget {
            logical_interface: logical.to_string(),
            entry_id: entry_id.clone(),
        })
    }

    /// DynDNS entry id for the interface a gateway sits on
    pub fn cache_id_for_gateway(&self, gateway: &str) -> Option<&str> {
        let logical = self.maps.gateway_interfaces.get(gateway)?;
        self.maps
            .interface_cache_ids
            .get(logical)
            .map(String::as_str)
    }

    /// The underlying maps
    pub fn maps(&self) -> &TopologyMaps {
        &self.maps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_maps() -> TopologyMaps {
        let mut maps = TopologyMaps::default();
        maps.gateway_interfaces
            .insert("WAN_DHCP".to_string(), "wan".to_string());
        maps.gateway_interfaces
            .insert("OPT1_GW".to_string(), "opt1".to_string());
        maps.physical_to_logical
            .insert("em0".to_string(), "wan".to_string());
        maps.physical_to_logical
            .insert("ixl2".to_string(), "opt1".to_string());
        maps.physical_to_logical
            .insert("igb3".to_string(), "opt2".to_string());
        maps.address_interfaces
            .insert("203.0.113.5".parse().unwrap(), "em0".to_string());
        maps.address_interfaces
            .insert("198.51.100.7".parse().unwrap(), "ixl2".to_string());
        maps.address_interfaces
            .insert("192.0.2.44".parse().unwrap(), "igb3".to_string());
        maps.interface_cache_ids
            .insert("wan".to_string(), "0".to_string());
        maps.interface_cache_ids
            .insert("opt2".to_string(), "3".to_string());
        maps
    }

    #[test]
    fn test_full_chain_resolves_gateway() {
        let topology = Topology::new(sample_maps());
        let address: IpAddr = "203.0.113.5".parse().unwrap();

        assert_eq!(topology.gateway_for(&address), Some("WAN_DHCP"));
        assert_eq!(
            topology.cache_target_for(&address),
            Some(CacheTarget {
                logical_interface: "wan".to_string(),
                entry_id: "0".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_links_yield_none() {
        let topology = Topology::new(sample_maps());

        // unknown address
        let unknown: IpAddr = "203.0.113.200".parse().unwrap();
        assert_eq!(topology.gateway_for(&unknown), None);
        assert_eq!(topology.cache_target_for(&unknown), None);

        // gateway resolves but no entry id for opt1
        let opt1: IpAddr = "198.51.100.7".parse().unwrap();
        assert_eq!(topology.gateway_for(&opt1), Some("OPT1_GW"));
        assert_eq!(topology.cache_target_for(&opt1), None);
    }

    #[test]
    fn test_cache_target_without_gateway() {
        let topology = Topology::new(sample_maps());
        let address: IpAddr = "192.0.2.44".parse().unwrap();

        assert_eq!(topology.gateway_for(&address), None);
        assert_eq!(
            topology.cache_target_for(&address).map(|t| t.entry_id),
            Some("3".to_string())
        );
    }

    #[test]
    fn test_cache_id_for_gateway() {
        let topology = Topology::new(sample_maps());
        assert_eq!(topology.cache_id_for_gateway("WAN_DHCP"), Some("0"));
        assert_eq!(topology.cache_id_for_gateway("OPT1_GW"), None);
        assert_eq!(topology.cache_id_for_gateway("NOPE"), None);
    }

    #[test]
    fn test_shared_interface_picks_first_gateway_name() {
        let mut maps = sample_maps();
        maps.gateway_interfaces
            .insert("A_WAN_V6".to_string(), "wan".to_string());
        let topology = Topology::new(maps);

        let address: IpAddr = "203.0.113.5".parse().unwrap();
        assert_eq!(topology.gateway_for(&address), Some("A_WAN_V6"));
    }
}
