// # DNS Publisher Trait
//
// Defines the interface for replacing the A and AAAA record sets of one DNS
// name via a provider API.
//
// ## Implementations
//
// - PowerDNS: `gwddns-provider-powerdns` crate
// - Future: RFC 2136 dynamic updates
//
// ## Usage
//
// ```rust,ignore
// use gwddns_core::traits::{DnsPublisher, ReplaceRequest};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let publisher = /* DnsPublisher implementation */;
//
//     let request = ReplaceRequest::new("example.org.", "home.example.org.", 60)
//         .with_a(["203.0.113.5".parse()?]);
//     publisher.replace_records(&request).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr};

/// A declarative full replace of one name's A and AAAA record sets
///
/// Both sets are always sent. An empty set removes every record of that type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceRequest {
    /// Zone holding the record
    pub zone: String,
    /// Fully qualified record name
    pub record_name: String,
    /// TTL for both record sets
    pub ttl: u32,
    /// Complete A record set
    pub a: Vec<Ipv4Addr>,
    /// Complete AAAA record set
    pub aaaa: Vec<Ipv6Addr>,
}

impl ReplaceRequest {
    /// Create a request with empty record sets
    pub fn new(zone: impl Into<String>, record_name: impl Into<String>, ttl: u32) -> Self {
        Self {
            zone: zone.into(),
            record_name: record_name.into(),
            ttl,
            a: Vec::new(),
            aaaa: Vec::new(),
        }
    }

    /// Set the A record set
    pub fn with_a(mut self, a: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        self.a = a.into_iter().collect();
        self
    }

    /// Set the AAAA record set
    pub fn with_aaaa(mut self, aaaa: impl IntoIterator<Item = Ipv6Addr>) -> Self {
        self.aaaa = aaaa.into_iter().collect();
        self
    }
}

/// Trait for DNS publisher implementations
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a failed run is retried by the next trigger)
/// - ❌ Access the state store or cache markers (owned by `Reconciler`)
/// - ❌ Decide whether an update is needed (owned by `Reconciler`)
/// - ❌ Merge with existing records; the request is the complete final state
#[async_trait]
pub trait DnsPublisher: Send + Sync {
    /// Replace the record sets named in `request`
    ///
    /// # Idempotency
    ///
    /// Replaying the same request must leave the zone in the same state.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider confirmed the replace
    /// - `Err(Error)`: Anything else, including unexpected success codes
    async fn replace_records(&self, request: &ReplaceRequest) -> Result<(), crate::Error>;

    /// Get the publisher name (for logging/debugging)
    fn publisher_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS publishers from configuration
pub trait DnsPublisherFactory: Send + Sync {
    /// Create a DnsPublisher instance from configuration
    fn create(
        &self,
        config: &crate::config::PublisherConfig,
    ) -> Result<Box<dyn DnsPublisher>, crate::Error>;
}
