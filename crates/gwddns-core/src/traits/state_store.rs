// # State Store Trait
//
// Defines the interface for persisting the last-published healthy address
// sets.
//
// ## Purpose
//
// The persisted state is the baseline every run diffs against. It is only
// written after a confirmed publish, so a failed publish leaves the baseline
// untouched and the next run retries the same delta.
//
// ## Implementations
//
// - File-based: JSON file with atomic replace (`FileStateStore`)
// - In-memory: for tests and embedding (`MemoryStateStore`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::state::RunLock;

/// Last-published healthy address sets
///
/// Serialized as `{"ipv4": {addr: timestamp}, "ipv6": {addr: timestamp}}`.
/// Only the address keys drive change detection; timestamps are
/// informational and kept verbatim as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub ipv4: BTreeMap<Ipv4Addr, String>,
    #[serde(default)]
    pub ipv6: BTreeMap<Ipv6Addr, String>,
}

impl PersistedState {
    /// State holding exactly `ipv4` and `ipv6`, each stamped with `now`
    pub fn stamped<'a>(
        ipv4: impl IntoIterator<Item = &'a Ipv4Addr>,
        ipv6: impl IntoIterator<Item = &'a Ipv6Addr>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let stamp = now.to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
        Self {
            ipv4: ipv4.into_iter().map(|ip| (*ip, stamp.clone())).collect(),
            ipv6: ipv6.into_iter().map(|ip| (*ip, stamp.clone())).collect(),
        }
    }

    /// Whether the published key sets differ from the given healthy sets
    pub fn has_changed(&self, healthy_v4: &BTreeSet<Ipv4Addr>, healthy_v6: &BTreeSet<Ipv6Addr>) -> bool {
        !self.ipv4.keys().eq(healthy_v4.iter()) || !self.ipv6.keys().eq(healthy_v6.iter())
    }

    /// Whether nothing has ever been published
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }
}

/// Trait for state store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Keep backups for corruption recovery
///
/// ## Forbidden Capabilities
/// - ❌ Merge or keep history; `save` replaces everything
/// - ❌ Decide when to save (owned by `Reconciler`)
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last-published state
    ///
    /// # Returns
    ///
    /// - `Ok(PersistedState)`: The state, empty if nothing was ever saved
    /// - `Err(Error)`: Storage error; callers treat this as "never published"
    async fn load(&self) -> Result<PersistedState, crate::Error>;

    /// Replace the persisted state wholesale
    async fn save(&self, state: &PersistedState) -> Result<(), crate::Error>;

    /// Keep other processes sharing this state out of the coming run
    ///
    /// The returned guard is held until the run ends. Stores private to one
    /// process return `None`.
    async fn lock_run(&self) -> Result<Option<RunLock>, crate::Error> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_changed_compares_keys_only() {
        let mut previous = PersistedState::default();
        previous
            .ipv4
            .insert("203.0.113.5".parse().unwrap(), "t0".to_string());

        let same: BTreeSet<Ipv4Addr> = ["203.0.113.5".parse().unwrap()].into();
        let other: BTreeSet<Ipv4Addr> = ["203.0.113.9".parse().unwrap()].into();
        let none_v6 = BTreeSet::new();

        assert!(!previous.has_changed(&same, &none_v6));
        assert!(previous.has_changed(&other, &none_v6));
        assert!(previous.has_changed(&BTreeSet::new(), &none_v6));

        let v6: BTreeSet<Ipv6Addr> = ["2001:db8::1".parse().unwrap()].into();
        assert!(previous.has_changed(&same, &v6));
    }

    #[test]
    fn test_stamped_uses_one_timestamp() {
        let v4: BTreeSet<Ipv4Addr> = ["203.0.113.5".parse().unwrap(), "198.51.100.7".parse().unwrap()].into();
        let v6: BTreeSet<Ipv6Addr> = BTreeSet::new();
        let now = chrono::Utc::now();

        let state = PersistedState::stamped(&v4, &v6, now);

        assert_eq!(state.ipv4.len(), 2);
        let stamps: BTreeSet<&String> = state.ipv4.values().collect();
        assert_eq!(stamps.len(), 1);
        assert!(!state.has_changed(&v4, &v6));
    }

    #[test]
    fn test_json_format() {
        let json = r#"{"ipv4": {"203.0.113.5": "2024-05-01T10:00:00.000000"}, "ipv6": {}}"#;
        let state: PersistedState = serde_json::from_str(json).unwrap();
        assert_eq!(state.ipv4.len(), 1);
        assert_eq!(state.ipv4.values().next().unwrap(), "2024-05-01T10:00:00.000000");

        let written = serde_json::to_value(&state).unwrap();
        assert_eq!(written["ipv4"]["203.0.113.5"], "2024-05-01T10:00:00.000000");
        assert!(written["ipv6"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_missing_family_defaults_to_empty() {
        let state: PersistedState = serde_json::from_str("{}").unwrap();
        assert!(state.is_empty());
    }
}
