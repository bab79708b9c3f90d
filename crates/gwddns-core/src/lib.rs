// # gwddns-core
//
// Core library for the gateway-health-aware DDNS reconciler.
//
// ## Architecture Overview
//
// This library keeps one DNS name's A/AAAA record sets equal to the public
// addresses whose upstream gateway is currently healthy:
// - **PlatformAdapter**: Trait for reading gateway, topology and address facts
// - **DnsPublisher**: Trait for replacing DNS record sets via provider APIs
// - **StateStore**: Trait for persisting the last-published healthy sets
// - **Reconciler**: Core engine running gather → classify → decide → publish
// - **GatewayWatcher**: Polls gateway health and triggers forced runs
// - **Registry**: Plugin-based registry for publishers and platforms
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Health rules and diffing are pure; I/O sits
//    behind traits
// 2. **Degrade, don't fail**: A missing fact makes addresses unhealthy; it
//    never aborts a run
// 3. **Plugin-Based**: Publishers and platforms are registered dynamically
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Publish before persist**: State and cache markers only follow a
//    confirmed publish

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod notify;
pub mod partition;
pub mod registry;
pub mod state;
pub mod topology;
pub mod traits;
pub mod watch;

// Re-export core types for convenience
pub use cache::FileCacheWriter;
pub use config::{GwddnsConfig, PlatformConfig, PublisherConfig, RecordConfig};
pub use engine::{ReconcileEvent, Reconciler, RunOptions, RunOutcome, RunReport};
pub use error::{Error, Result};
pub use health::{GatewayStatus, GatewayStatusMap};
pub use notify::LogNotifier;
pub use partition::{FamilyFilter, HealthPartition};
pub use registry::Registry;
pub use state::{FileStateStore, MemoryStateStore};
pub use topology::{CacheTarget, Topology};
pub use traits::{DnsPublisher, PlatformAdapter, StateStore};
pub use watch::GatewayWatcher;
