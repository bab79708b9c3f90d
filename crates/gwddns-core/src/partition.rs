//! Address health partitioning
//!
//! Splits the discovered public addresses into healthy and unhealthy sets per
//! address family. An address is healthy iff its gateway resolves and that
//! gateway is online; every other discovered address is unhealthy. Addresses
//! are bucketed by their own family, so a v6 address handed over in the v4
//! discovery set still lands in the v6 partition.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::health::{GatewayStatusMap, is_online};
use crate::topology::Topology;

/// Restricts which family is published and cached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FamilyFilter {
    #[default]
    Both,
    V4Only,
    V6Only,
}

/// Result of one classification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthPartition {
    pub healthy_v4: BTreeSet<Ipv4Addr>,
    pub unhealthy_v4: BTreeSet<Ipv4Addr>,
    pub healthy_v6: BTreeSet<Ipv6Addr>,
    pub unhealthy_v6: BTreeSet<Ipv6Addr>,
}

impl HealthPartition {
    /// Empty the sets of the family the filter excludes
    pub fn apply_filter(mut self, filter: FamilyFilter) -> Self {
        match filter {
            FamilyFilter::Both => {}
            FamilyFilter::V4Only => {
                self.healthy_v6.clear();
                self.unhealthy_v6.clear();
            }
            FamilyFilter::V6Only => {
                self.healthy_v4.clear();
                self.unhealthy_v4.clear();
            }
        }
        self
    }

    /// Healthy addresses of both families
    pub fn healthy(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.healthy_v4
            .iter()
            .copied()
            .map(IpAddr::V4)
            .chain(self.healthy_v6.iter().copied().map(IpAddr::V6))
    }

    /// Unhealthy addresses of both families
    pub fn unhealthy(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.unhealthy_v4
            .iter()
            .copied()
            .map(IpAddr::V4)
            .chain(self.unhealthy_v6.iter().copied().map(IpAddr::V6))
    }

    pub fn has_unhealthy(&self) -> bool {
        !self.unhealthy_v4.is_empty() || !self.unhealthy_v6.is_empty()
    }

    fn insert(&mut self, address: IpAddr, healthy: bool) {
        match (address, healthy) {
            (IpAddr::V4(v4), true) => {
                self.healthy_v4.insert(v4);
            }
            (IpAddr::V4(v4), false) => {
                self.unhealthy_v4.insert(v4);
            }
            (IpAddr::V6(v6), true) => {
                self.healthy_v6.insert(v6);
            }
            (IpAddr::V6(v6), false) => {
                self.unhealthy_v6.insert(v6);
            }
        }
    }
}

/// Classify every discovered address
pub fn classify_addresses<'a>(
    discovered: impl IntoIterator<Item = &'a IpAddr>,
    topology: &Topology,
    statuses: &GatewayStatusMap,
) -> HealthPartition {
    let mut partition = HealthPartition::default();

    for address in discovered {
        let healthy = topology
            .gateway_for(address)
            .is_some_and(|gateway| is_online(statuses, gateway));
        partition.insert(*address, healthy);
    }

    partition
}
