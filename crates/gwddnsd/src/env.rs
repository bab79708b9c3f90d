//! Environment configuration
//!
//! Every setting comes from a `GWDDNS_*` variable. Parsing goes through a
//! lookup function so the same code reads the process environment in the
//! binaries and a plain map in tests.
//!
//! | Variable | Default |
//! |---|---|
//! | `GWDDNS_ZONE`, `GWDDNS_RECORD_NAME` | required |
//! | `GWDDNS_TTL` | `60` |
//! | `GWDDNS_PUBLISHER_TYPE` | `powerdns` |
//! | `GWDDNS_PDNS_API_URL`, `GWDDNS_PDNS_API_KEY` | required for powerdns |
//! | `GWDDNS_PDNS_SERVER_ID` | `localhost` |
//! | `GWDDNS_PLATFORM_TYPE` | `pfsense` |
//! | `GWDDNS_PFSENSE_CONFIG` | `/conf/config.xml` |
//! | `GWDDNS_PFSENSE_PROBE_DIR` | `/var/run` |
//! | `GWDDNS_IFCONFIG_PATH` | `/sbin/ifconfig` |
//! | `GWDDNS_STATE_STORE_TYPE` | `file` |
//! | `GWDDNS_STATE_STORE_PATH` | `/var/db/gwddns.state.json` |
//! | `GWDDNS_CACHE_ENABLED` | `true` |
//! | `GWDDNS_CACHE_DIR` | `/conf` |
//! | `GWDDNS_LATENCY_HIGH_MS`, `GWDDNS_LOSS_HIGH_PCT` | `500`, `20` |
//! | `GWDDNS_REQUIRE_ZERO_LOSS` | `false` |
//! | `GWDDNS_ALLOWED_INTERFACES` | all interfaces |
//! | `GWDDNS_POLL_INTERVAL_SECS`, `GWDDNS_RUN_TIMEOUT_SECS` | `5`, `60` |
//! | `GWDDNS_NOTIFIER` | `log` (`log`, `pfsense`, `disabled`) |
//! | `GWDDNS_PHP_PATH` | `/usr/local/bin/php` |
//! | `GWDDNS_LOG_LEVEL` | `info` |

use std::str::FromStr;

use anyhow::{Result, bail};
use gwddns_core::config::{
    CacheConfig, DiscoveryConfig, HealthPolicy, NotifierConfig, StateStoreConfig, WatchConfig,
};
use gwddns_core::{GwddnsConfig, PlatformConfig, PublisherConfig, RecordConfig};
use tracing::Level;

/// Variable lookup; returns `None` for unset variables
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read a variable from the process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Full reconciler configuration, validated
pub fn reconciler_config(lookup: Lookup<'_>) -> Result<GwddnsConfig> {
    let mut record = RecordConfig::new(
        required(lookup, "GWDDNS_ZONE")?,
        required(lookup, "GWDDNS_RECORD_NAME")?,
    );
    if let Some(ttl) = parse(lookup, "GWDDNS_TTL")? {
        record = record.with_ttl(ttl);
    }

    let mut config = GwddnsConfig::new(record, publisher(lookup)?);
    config.platform = platform(lookup)?;
    config.state_store = state_store(lookup)?;
    config.cache = cache(lookup)?;
    config.health = health(lookup)?;
    config.discovery = DiscoveryConfig {
        allowed_physical_interfaces: list(lookup, "GWDDNS_ALLOWED_INTERFACES"),
    };
    config.watch = watch(lookup)?;
    config.notifier = notifier(lookup)?;

    config.validate()?;
    Ok(config)
}

fn publisher(lookup: Lookup<'_>) -> Result<PublisherConfig> {
    let publisher_type =
        optional(lookup, "GWDDNS_PUBLISHER_TYPE").unwrap_or_else(|| "powerdns".to_string());
    match publisher_type.as_str() {
        "powerdns" => Ok(PublisherConfig::PowerDns {
            api_url: required(lookup, "GWDDNS_PDNS_API_URL")?,
            api_key: required(lookup, "GWDDNS_PDNS_API_KEY")?,
            server_id: optional(lookup, "GWDDNS_PDNS_SERVER_ID")
                .unwrap_or_else(|| "localhost".to_string()),
        }),
        other => bail!(
            "GWDDNS_PUBLISHER_TYPE '{}' is not supported. Supported publishers: powerdns",
            other
        ),
    }
}

/// Platform adapter configuration
pub fn platform(lookup: Lookup<'_>) -> Result<PlatformConfig> {
    let platform_type =
        optional(lookup, "GWDDNS_PLATFORM_TYPE").unwrap_or_else(|| "pfsense".to_string());
    if platform_type != "pfsense" {
        bail!(
            "GWDDNS_PLATFORM_TYPE '{}' is not supported. Supported platforms: pfsense",
            platform_type
        );
    }

    let PlatformConfig::PfSense {
        config_path,
        probe_dir,
        ifconfig_path,
    } = PlatformConfig::default()
    else {
        bail!("Default platform is not pfsense");
    };

    let config = PlatformConfig::PfSense {
        config_path: optional(lookup, "GWDDNS_PFSENSE_CONFIG").unwrap_or(config_path),
        probe_dir: optional(lookup, "GWDDNS_PFSENSE_PROBE_DIR").unwrap_or(probe_dir),
        ifconfig_path: optional(lookup, "GWDDNS_IFCONFIG_PATH").unwrap_or(ifconfig_path),
    };
    config.validate()?;
    Ok(config)
}

fn state_store(lookup: Lookup<'_>) -> Result<StateStoreConfig> {
    match optional(lookup, "GWDDNS_STATE_STORE_TYPE").as_deref() {
        None | Some("file") => Ok(match optional(lookup, "GWDDNS_STATE_STORE_PATH") {
            Some(path) => StateStoreConfig::File { path },
            None => StateStoreConfig::default(),
        }),
        Some("memory") => Ok(StateStoreConfig::Memory),
        Some(other) => bail!(
            "GWDDNS_STATE_STORE_TYPE '{}' is not supported. Supported types: file, memory",
            other
        ),
    }
}

fn cache(lookup: Lookup<'_>) -> Result<CacheConfig> {
    let defaults = CacheConfig::default();
    Ok(CacheConfig {
        enabled: flag(lookup, "GWDDNS_CACHE_ENABLED")?.unwrap_or(defaults.enabled),
        directory: optional(lookup, "GWDDNS_CACHE_DIR").unwrap_or(defaults.directory),
    })
}

/// Gateway health policy
pub fn health(lookup: Lookup<'_>) -> Result<HealthPolicy> {
    let defaults = HealthPolicy::default();
    let policy = HealthPolicy {
        default_latency_high_ms: parse(lookup, "GWDDNS_LATENCY_HIGH_MS")?
            .unwrap_or(defaults.default_latency_high_ms),
        default_loss_high_pct: parse(lookup, "GWDDNS_LOSS_HIGH_PCT")?
            .unwrap_or(defaults.default_loss_high_pct),
        require_zero_loss: flag(lookup, "GWDDNS_REQUIRE_ZERO_LOSS")?
            .unwrap_or(defaults.require_zero_loss),
    };
    policy.validate()?;
    Ok(policy)
}

/// Watch loop settings
pub fn watch(lookup: Lookup<'_>) -> Result<WatchConfig> {
    let defaults = WatchConfig::default();
    Ok(WatchConfig {
        poll_interval_secs: parse(lookup, "GWDDNS_POLL_INTERVAL_SECS")?
            .unwrap_or(defaults.poll_interval_secs),
        run_timeout_secs: parse(lookup, "GWDDNS_RUN_TIMEOUT_SECS")?
            .unwrap_or(defaults.run_timeout_secs),
    })
}

fn notifier(lookup: Lookup<'_>) -> Result<NotifierConfig> {
    match optional(lookup, "GWDDNS_NOTIFIER").as_deref() {
        None | Some("log") => Ok(NotifierConfig::Log),
        Some("pfsense") => Ok(NotifierConfig::PfSense {
            php_path: optional(lookup, "GWDDNS_PHP_PATH")
                .unwrap_or_else(|| "/usr/local/bin/php".to_string()),
        }),
        Some("disabled") => Ok(NotifierConfig::Disabled),
        Some(other) => bail!(
            "GWDDNS_NOTIFIER '{}' is not supported. Supported notifiers: log, pfsense, disabled",
            other
        ),
    }
}

/// Log level from `GWDDNS_LOG_LEVEL`
pub fn log_level(lookup: Lookup<'_>) -> Result<Level> {
    match optional(lookup, "GWDDNS_LOG_LEVEL")
        .unwrap_or_else(|| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => bail!(
            "GWDDNS_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            other
        ),
    }
}

/// Set, non-blank variable
fn optional(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(lookup: Lookup<'_>, key: &str) -> Result<String> {
    match optional(lookup, key) {
        Some(value) => Ok(value),
        None => bail!("{} is required. Set it via: export {}=...", key, key),
    }
}

fn parse<T: FromStr>(lookup: Lookup<'_>, key: &str) -> Result<Option<T>> {
    match optional(lookup, key) {
        None => Ok(None),
        Some(value) => match value.parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => bail!("{} must be a non-negative number. Got: {}", key, value),
        },
    }
}

fn flag(lookup: Lookup<'_>, key: &str) -> Result<Option<bool>> {
    match optional(lookup, key).map(|v| v.to_lowercase()).as_deref() {
        None => Ok(None),
        Some("1" | "true" | "yes" | "on") => Ok(Some(true)),
        Some("0" | "false" | "no" | "off") => Ok(Some(false)),
        Some(other) => bail!("{} must be true or false. Got: {}", key, other),
    }
}

fn list(lookup: Lookup<'_>, key: &str) -> Vec<String> {
    optional(lookup, key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
