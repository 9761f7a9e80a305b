use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use domain::fleet::RegistrySnapshot;
use domain::gateway::{DeviceConfig, DeviceStatus, GatewayId};

/// Latest published status per gateway.
///
/// Every entry is an `Arc<DeviceStatus>` swapped as a whole, so a reader
/// holding one never observes a half-written status and never waits on a poll.
pub struct StatusStore {
    order: Vec<GatewayId>,
    entries: DashMap<GatewayId, Arc<DeviceStatus>>,
}

impl StatusStore {
    pub fn new(configs: impl IntoIterator<Item = Arc<DeviceConfig>>) -> Self {
        let entries = DashMap::new();
        let mut order = Vec::new();
        for config in configs {
            order.push(config.id.clone());
            entries.insert(config.id.clone(), Arc::new(DeviceStatus::initial(config)));
        }
        Self { order, entries }
    }

    pub fn get(&self, id: &str) -> Option<Arc<DeviceStatus>> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Copy of every entry in configuration order. Entries are read one by one,
    /// without cross-gateway synchronization.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.order
            .iter()
            .filter_map(|id| self.get(id.as_str()).map(|status| (id.clone(), status)))
            .collect()
    }

    /// Configured ids in configuration order
    pub fn ids(&self) -> &[GatewayId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Swap in a new status for its gateway. Only the owning poller calls this.
    ///
    /// `last_updated` never moves backwards: an older or missing timestamp is
    /// replaced by the one already published.
    pub fn replace(&self, mut status: DeviceStatus) -> Arc<DeviceStatus> {
        let Some(mut slot) = self.entries.get_mut(status.id().as_str()) else {
            warn!(gateway_id = %status.id(), "Ignoring status for unregistered gateway");
            return Arc::new(status);
        };
        status.last_updated = status.last_updated.max(slot.last_updated);
        let status = Arc::new(status);
        *slot = status.clone();
        status
    }

    /// Replace every entry with an offline status carrying `reason`.
    pub fn mark_all_offline(&self, reason: &str) {
        for mut entry in self.entries.iter_mut() {
            let stopped = DeviceStatus {
                online: false,
                snapshot: None,
                error: Some(reason.to_string()),
                ..entry.value().as_ref().clone()
            };
            *entry.value_mut() = Arc::new(stopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use domain::gateway::{PowerFlow, Snapshot, TransportConfig, TransportKind};
    use std::time::Duration;

    fn config(id: &str) -> Arc<DeviceConfig> {
        Arc::new(DeviceConfig::new(
            GatewayId::new(id).unwrap(),
            id,
            TransportConfig::new(TransportKind::Simulator),
            Duration::from_secs(1),
        ))
    }

    #[test]
    fn test_new_store_is_offline_in_config_order() {
        let store = StatusStore::new(vec![config("b"), config("a"), config("c")]);
        let snapshot = store.snapshot();

        let ids: Vec<&str> = snapshot.keys().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(snapshot.values().all(|s| !s.online && s.snapshot.is_none()));
    }

    #[test]
    fn test_get_unknown_returns_none() {
        let store = StatusStore::new(vec![config("a")]);
        assert!(store.get("a").is_some());
        assert!(store.get("zzz").is_none());
    }

    #[test]
    fn test_replace_swaps_whole_value() {
        let store = StatusStore::new(vec![config("a")]);
        let before = store.get("a").unwrap();

        let next =
            DeviceStatus::online(config("a"), Snapshot::new(PowerFlow::default()), Utc::now());
        store.replace(next);

        let after = store.get("a").unwrap();
        assert!(!before.online);
        assert!(after.online);
    }

    #[test]
    fn test_last_updated_never_regresses() {
        let store = StatusStore::new(vec![config("a")]);
        let now = Utc::now();
        store.replace(DeviceStatus::online(
            config("a"),
            Snapshot::new(PowerFlow::default()),
            now,
        ));

        let stale = DeviceStatus::online(
            config("a"),
            Snapshot::new(PowerFlow::default()),
            now - ChronoDuration::seconds(30),
        );
        let committed = store.replace(stale);
        assert_eq!(committed.last_updated, Some(now));

        let mut cleared = DeviceStatus::initial(config("a"));
        cleared.error = Some("reset".into());
        assert_eq!(store.replace(cleared).last_updated, Some(now));
    }

    #[test]
    fn test_replace_for_unknown_gateway_is_ignored() {
        let store = StatusStore::new(vec![config("a")]);
        store.replace(DeviceStatus::initial(config("ghost")));
        assert_eq!(store.len(), 1);
        assert!(store.get("ghost").is_none());
    }

    #[test]
    fn test_mark_all_offline() {
        let store = StatusStore::new(vec![config("a"), config("b")]);
        store.replace(DeviceStatus::online(
            config("a"),
            Snapshot::new(PowerFlow::default()),
            Utc::now(),
        ));

        store.mark_all_offline("stopped");
        for status in store.snapshot().values() {
            assert!(!status.online);
            assert!(status.snapshot.is_none());
            assert_eq!(status.error.as_deref(), Some("stopped"));
        }
        assert!(store.get("a").unwrap().last_updated.is_some());
    }
}
