//! Plugin-based component registry
//!
//! The registry allows DNS publishers and platform adapters to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gwddns_core::registry::Registry;
//! use gwddns_core::config::PublisherConfig;
//!
//! let registry = Registry::new();
//! gwddns_provider_powerdns::register(&registry);
//!
//! let config = PublisherConfig::PowerDns { ... };
//! let publisher = registry.create_publisher(&config)?;
//! ```
//!
//! ## Registration
//!
//! Implementations should register themselves during initialization:
//!
//! ```rust,ignore
//! // In gwddns-platform-pfsense crate
//! pub fn register(registry: &Registry) {
//!     registry.register_platform("pfsense", Box::new(PfSenseFactory));
//! }
//! ```

use crate::config::{PlatformConfig, PublisherConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsPublisher, DnsPublisherFactory, PlatformAdapter, PlatformFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry for plugin-based publisher and platform creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct Registry {
    /// Registered DNS publisher factories
    publishers: RwLock<HashMap<String, Box<dyn DnsPublisherFactory>>>,

    /// Registered platform adapter factories
    platforms: RwLock<HashMap<String, Box<dyn PlatformFactory>>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS publisher factory under `name` (e.g., "powerdns")
    pub fn register_publisher(&self, name: impl Into<String>, factory: Box<dyn DnsPublisherFactory>) {
        match self.publishers.write() {
            Ok(mut publishers) => {
                publishers.insert(name.into(), factory);
            }
            Err(_) => tracing::error!("Publisher registry lock poisoned, registration dropped"),
        }
    }

    /// Register a platform adapter factory under `name` (e.g., "pfsense")
    pub fn register_platform(&self, name: impl Into<String>, factory: Box<dyn PlatformFactory>) {
        match self.platforms.write() {
            Ok(mut platforms) => {
                platforms.insert(name.into(), factory);
            }
            Err(_) => tracing::error!("Platform registry lock poisoned, registration dropped"),
        }
    }

    /// Create a DNS publisher from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsPublisher>)`: Created publisher instance
    /// - `Err(Error)`: If the publisher type is not registered or creation fails
    pub fn create_publisher(&self, config: &PublisherConfig) -> Result<Box<dyn DnsPublisher>> {
        let publisher_type = config.type_name();
        let publishers = self
            .publishers
            .read()
            .map_err(|_| Error::Other("Publisher registry lock poisoned".to_string()))?;

        let factory = publishers.get(publisher_type).ok_or_else(|| {
            Error::config(format!("Unknown publisher type: {}", publisher_type))
        })?;

        factory.create(config)
    }

    /// Create a platform adapter from configuration
    pub fn create_platform(&self, config: &PlatformConfig) -> Result<Box<dyn PlatformAdapter>> {
        let platform_type = config.type_name();
        let platforms = self
            .platforms
            .read()
            .map_err(|_| Error::Other("Platform registry lock poisoned".to_string()))?;

        let factory = platforms
            .get(platform_type)
            .ok_or_else(|| Error::config(format!("Unknown platform type: {}", platform_type)))?;

        factory.create(config)
    }

    /// List all registered publisher types
    pub fn list_publishers(&self) -> Vec<String> {
        self.publishers
            .read()
            .map(|publishers| publishers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// List all registered platform types
    pub fn list_platforms(&self) -> Vec<String> {
        self.platforms
            .read()
            .map(|platforms| platforms.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if a publisher type is registered
    pub fn has_publisher(&self, name: &str) -> bool {
        self.publishers
            .read()
            .map(|publishers| publishers.contains_key(name))
            .unwrap_or(false)
    }

    /// Check if a platform type is registered
    pub fn has_platform(&self, name: &str) -> bool {
        self.platforms
            .read()
            .map(|platforms| platforms.contains_key(name))
            .unwrap_or(false)
    }
}
