//! Core traits for the gwddns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`PlatformAdapter`]: Read gateway, interface and address facts from the host
//! - [`DnsPublisher`]: Replace DNS record sets via provider APIs
//! - [`StateStore`]: Persist the last-published healthy sets
//! - [`CacheWriter`]: Write per-address cache markers
//! - [`Notifier`]: Report published changes
//! - [`RunTrigger`]: Start a reconciliation run from the watcher

pub mod cache_writer;
pub mod dns_publisher;
pub mod notifier;
pub mod platform;
pub mod run_trigger;
pub mod state_store;

pub use cache_writer::{CacheMarker, CacheWriter};
pub use dns_publisher::{DnsPublisher, DnsPublisherFactory, ReplaceRequest};
pub use notifier::Notifier;
pub use platform::{IpFamily, PlatformAdapter, PlatformFactory};
pub use run_trigger::{RunTrigger, TriggerRequest};
pub use state_store::{PersistedState, StateStore};
