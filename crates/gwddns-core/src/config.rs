//! Configuration types for the gwddns system
//!
//! Settings for the reconciler, the watcher and the plug-ins they load.
//! The daemon binaries fill these from environment variables; embedders can
//! build them directly or deserialize them.

use serde::{Deserialize, Serialize};

/// Main gwddns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GwddnsConfig {
    /// The single DNS record kept in sync
    pub record: RecordConfig,

    /// DNS publisher configuration
    pub publisher: PublisherConfig,

    /// Platform adapter configuration
    #[serde(default)]
    pub platform: PlatformConfig,

    /// State store configuration
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Cache marker configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Gateway health policy
    #[serde(default)]
    pub health: HealthPolicy,

    /// Address discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Watch loop settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Notification settings
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl GwddnsConfig {
    /// Create a configuration for one record with defaults everywhere else
    pub fn new(record: RecordConfig, publisher: PublisherConfig) -> Self {
        Self {
            record,
            publisher,
            platform: PlatformConfig::default(),
            state_store: StateStoreConfig::default(),
            cache: CacheConfig::default(),
            health: HealthPolicy::default(),
            discovery: DiscoveryConfig::default(),
            watch: WatchConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.record.validate()?;
        self.publisher.validate()?;
        self.platform.validate()?;
        self.health.validate()?;
        self.watch.validate()?;

        if let StateStoreConfig::File { path } = &self.state_store
            && path.is_empty()
        {
            return Err(crate::Error::config("State file path cannot be empty"));
        }

        if self.cache.enabled && self.cache.directory.is_empty() {
            return Err(crate::Error::config(
                "Cache directory cannot be empty when cache markers are enabled",
            ));
        }

        Ok(())
    }
}

/// The DNS record to reconcile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Zone holding the record (e.g., "example.org.")
    pub zone: String,

    /// Fully qualified record name (e.g., "home.example.org.")
    pub name: String,

    /// TTL for the A and AAAA record sets
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl RecordConfig {
    /// Create a record configuration with the default TTL
    pub fn new(zone: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            name: name.into(),
            ttl: default_ttl(),
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.zone.trim_end_matches('.').is_empty() {
            return Err(crate::Error::config("DNS zone cannot be empty"));
        }
        if self.name.trim_end_matches('.').is_empty() {
            return Err(crate::Error::config("DNS record name cannot be empty"));
        }

        let zone = self.zone.trim_end_matches('.');
        let name = self.name.trim_end_matches('.');
        if name != zone && !name.ends_with(&format!(".{}", zone)) {
            return Err(crate::Error::config(format!(
                "Record {} is not inside zone {}",
                self.name, self.zone
            )));
        }

        if self.ttl == 0 {
            return Err(crate::Error::config("Record TTL must be > 0"));
        }
        Ok(())
    }
}

fn default_ttl() -> u32 {
    60
}

/// DNS publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PublisherConfig {
    /// PowerDNS authoritative server HTTP API
    PowerDns {
        /// API base URL (e.g., "https://pdns-api/api/v1")
        api_url: String,
        /// API key sent as `X-API-Key`
        api_key: String,
        /// Server id (usually "localhost")
        #[serde(default = "default_server_id")]
        server_id: String,
    },

    /// Custom publisher
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl PublisherConfig {
    /// Validate the publisher configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            PublisherConfig::PowerDns {
                api_url,
                api_key,
                server_id,
            } => {
                if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "PowerDNS API URL must use HTTP or HTTPS scheme. Got: {}",
                        api_url
                    )));
                }
                if api_key.is_empty() {
                    return Err(crate::Error::config("PowerDNS API key cannot be empty"));
                }
                if server_id.is_empty() {
                    return Err(crate::Error::config("PowerDNS server id cannot be empty"));
                }
                Ok(())
            }
            PublisherConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom publisher factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom publisher config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the publisher type name
    pub fn type_name(&self) -> &str {
        match self {
            PublisherConfig::PowerDns { .. } => "powerdns",
            PublisherConfig::Custom { factory, .. } => factory,
        }
    }
}

fn default_server_id() -> String {
    "localhost".to_string()
}

/// Platform adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformConfig {
    /// pfSense firewall
    PfSense {
        /// Path to config.xml
        config_path: String,
        /// Directory holding the dpinger status sockets
        probe_dir: String,
        /// Path to the ifconfig binary
        ifconfig_path: String,
    },

    /// Custom platform adapter
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl PlatformConfig {
    /// Validate the platform configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            PlatformConfig::PfSense {
                config_path,
                probe_dir,
                ifconfig_path,
            } => {
                if config_path.is_empty() || probe_dir.is_empty() || ifconfig_path.is_empty() {
                    return Err(crate::Error::config(
                        "pfSense platform paths cannot be empty",
                    ));
                }
                Ok(())
            }
            PlatformConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom platform factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the platform type name
    pub fn type_name(&self) -> &str {
        match self {
            PlatformConfig::PfSense { .. } => "pfsense",
            PlatformConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig::PfSense {
            config_path: "/conf/config.xml".to_string(),
            probe_dir: "/var/run".to_string(),
            ifconfig_path: "/sbin/ifconfig".to_string(),
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    Memory,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::File {
            path: "/var/db/gwddns.state.json".to_string(),
        }
    }
}

/// Cache marker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether marker files are written at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory the marker files live in
    #[serde(default = "default_cache_directory")]
    pub directory: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_directory(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_directory() -> String {
    "/conf".to_string()
}

/// Gateway health policy
///
/// Platform-wide defaults from the adapter take precedence over the
/// defaults here; per-gateway overrides take precedence over both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPolicy {
    /// Latency ceiling in milliseconds when nothing else is configured
    #[serde(default = "default_latency_high_ms")]
    pub default_latency_high_ms: u32,

    /// Loss ceiling in percent when nothing else is configured
    #[serde(default = "default_loss_high_pct")]
    pub default_loss_high_pct: u32,

    /// Treat any packet loss as down, before thresholds are checked
    #[serde(default)]
    pub require_zero_loss: bool,
}

impl HealthPolicy {
    /// Reject thresholds that would mark every gateway down
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.default_latency_high_ms == 0 {
            return Err(crate::Error::config("Default latency threshold must be > 0"));
        }
        if self.default_loss_high_pct == 0 || self.default_loss_high_pct > 100 {
            return Err(crate::Error::config(
                "Default loss threshold must be between 1 and 100",
            ));
        }
        Ok(())
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            default_latency_high_ms: default_latency_high_ms(),
            default_loss_high_pct: default_loss_high_pct(),
            require_zero_loss: false,
        }
    }
}

fn default_latency_high_ms() -> u32 {
    500
}

fn default_loss_high_pct() -> u32 {
    20
}

/// Address discovery settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Physical interfaces to discover addresses on (empty = all)
    #[serde(default)]
    pub allowed_physical_interfaces: Vec<String>,
}

/// Watch loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Seconds between gateway status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound for one triggered reconciliation run
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl WatchConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Watch poll interval must be > 0"));
        }
        if self.run_timeout_secs == 0 {
            return Err(crate::Error::config("Watch run timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_run_timeout_secs() -> u64 {
    60
}

/// Notification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Log the summary only
    #[default]
    Log,

    /// pfSense system notices
    PfSense {
        /// Path to the php binary
        php_path: String,
    },

    /// No notifications
    Disabled,
}
