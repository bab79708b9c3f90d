// # PowerDNS Publisher
//
// This crate provides a PowerDNS Authoritative Server HTTP API publisher for
// the gwddns reconciler.
//
// ## Behavior
//
// - ✅ One PATCH per run replacing both the A and the AAAA rrset
// - ✅ Empty rrsets are sent as-is, removing every record of that type
// - ✅ Success only on HTTP 204 No Content
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error messages for 401/403, 404, 422, 429 and 5xx
// - ❌ NO retry logic (the next trigger retries the same delta)
// - ❌ NO reading of current records (the request is the complete final state)
//
// ### Trust Level: Untrusted (DNS Publisher)
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic
// - ❌ Access state store or cache markers
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - Publisher MUST fail fast if the key is empty
//
// ## API Reference
//
// - PATCH `{api_url}/servers/{server_id}/zones/{zone}` with header `X-API-Key`
// - Body: `{"rrsets": [{name, type, ttl, changetype: "REPLACE", records: [{content, disabled}]}]}`

use async_trait::async_trait;
use gwddns_core::config::PublisherConfig;
use gwddns_core::traits::{DnsPublisher, DnsPublisherFactory, ReplaceRequest};
use gwddns_core::{Error, Result};
use serde::Serialize;
use std::fmt::Display;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PUBLISHER_NAME: &str = "powerdns";

/// PATCH body
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ZonePatch {
    pub rrsets: Vec<RrSet>,
}

/// One rrset replacement
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RrSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub ttl: u32,
    pub changetype: &'static str,
    pub records: Vec<RrRecord>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RrRecord {
    pub content: String,
    pub disabled: bool,
}

impl ZonePatch {
    /// Build the A + AAAA full replace for `request`
    pub fn from_request(request: &ReplaceRequest) -> Self {
        Self {
            rrsets: vec![
                RrSet::replace(&request.record_name, "A", request.ttl, &request.a),
                RrSet::replace(&request.record_name, "AAAA", request.ttl, &request.aaaa),
            ],
        }
    }
}

impl RrSet {
    fn replace<T: Display>(name: &str, record_type: &'static str, ttl: u32, contents: &[T]) -> Self {
        Self {
            name: name.to_string(),
            record_type,
            ttl,
            changetype: "REPLACE",
            records: contents
                .iter()
                .map(|content| RrRecord {
                    content: content.to_string(),
                    disabled: false,
                })
                .collect(),
        }
    }
}

/// PowerDNS publisher
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct PowerDnsPublisher {
    /// API base URL without trailing slash (e.g., "https://pdns/api/v1")
    api_url: String,

    /// API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Server id, usually "localhost"
    server_id: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for PowerDnsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerDnsPublisher")
            .field("api_url", &self.api_url)
            .field("api_key", &"<REDACTED>")
            .field("server_id", &self.server_id)
            .finish()
    }
}

impl PowerDnsPublisher {
    /// Create a new PowerDNS publisher
    ///
    /// # Errors
    ///
    /// Fails if the API key is empty or the HTTP client cannot be built.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        server_id: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("PowerDNS API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
            server_id: server_id.into(),
            client,
        })
    }

    /// Zone endpoint for `zone`
    pub fn zone_url(&self, zone: &str) -> String {
        format!("{}/servers/{}/zones/{}", self.api_url, self.server_id, zone)
    }
}

#[async_trait]
impl DnsPublisher for PowerDnsPublisher {
    async fn replace_records(&self, request: &ReplaceRequest) -> Result<()> {
        let url = self.zone_url(&request.zone);
        let body = ZonePatch::from_request(request);

        tracing::debug!(
            "PATCH {} ({} A, {} AAAA)",
            url,
            request.a.len(),
            request.aaaa.len()
        );

        let response = self
            .client
            .patch(&url)
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::provider(PUBLISHER_NAME, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 204 {
            tracing::info!(
                "PowerDNS accepted rrsets for {}: A={:?} AAAA={:?}",
                request.record_name,
                request.a,
                request.aaaa
            );
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(match status.as_u16() {
            401 | 403 => Error::auth(format!(
                "PowerDNS rejected the API key. Status: {}",
                status
            )),
            404 => Error::not_found(format!(
                "Zone {} not found on server {}",
                request.zone, self.server_id
            )),
            422 => Error::provider(
                PUBLISHER_NAME,
                format!("Rrsets rejected: {} - {}", status, error_text),
            ),
            429 => Error::provider(
                PUBLISHER_NAME,
                format!("Rate limit exceeded. Status: {}", status),
            ),
            500..=599 => Error::provider(
                PUBLISHER_NAME,
                format!("PowerDNS server error (transient): {} - {}", status, error_text),
            ),
            _ => Error::provider(
                PUBLISHER_NAME,
                format!("Unexpected response {} (expected 204): {}", status, error_text),
            ),
        })
    }

    fn publisher_name(&self) -> &'static str {
        PUBLISHER_NAME
    }
}

/// Factory for creating PowerDNS publishers
pub struct PowerDnsFactory;

impl DnsPublisherFactory for PowerDnsFactory {
    fn create(&self, config: &PublisherConfig) -> Result<Box<dyn DnsPublisher>> {
        match config {
            PublisherConfig::PowerDns {
                api_url,
                api_key,
                server_id,
            } => Ok(Box::new(PowerDnsPublisher::new(
                api_url.clone(),
                api_key.clone(),
                server_id.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for PowerDNS publisher")),
        }
    }
}

/// Register the PowerDNS publisher with a registry
///
/// # Example
///
/// ```rust
/// use gwddns_core::Registry;
///
/// let registry = Registry::new();
/// gwddns_provider_powerdns::register(&registry);
/// assert!(registry.has_publisher("powerdns"));
/// ```
pub fn register(registry: &gwddns_core::Registry) {
    registry.register_publisher(PUBLISHER_NAME, Box::new(PowerDnsFactory));
}
