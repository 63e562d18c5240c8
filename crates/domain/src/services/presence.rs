//! Presence cache: the authoritative, time-bounded view of visible devices.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::models::{PresenceEntry, Sighting};

/// A sighting with its resolved coordinates attached.
#[derive(Debug, Clone)]
pub struct ResolvedSighting {
    pub sighting: Sighting,
    pub latitude: f64,
    pub longitude: f64,
}

/// Shared cache of currently-visible devices.
///
/// Mutated only by the discovery cycle; readers always observe a fully
/// merged snapshot, never partial state. Notified snapshots are ordered by
/// address so consumers see a stable iteration order.
pub struct PresenceCache {
    entries: RwLock<HashMap<String, PresenceEntry>>,
    snapshots: broadcast::Sender<Vec<PresenceEntry>>,
    staleness_window: chrono::Duration,
}

impl PresenceCache {
    /// Create a cache that evicts entries unseen for `staleness_window`.
    pub fn new(staleness_window: Duration) -> Self {
        let (snapshots, _) = broadcast::channel(16);
        Self {
            entries: RwLock::new(HashMap::new()),
            snapshots,
            staleness_window: chrono::Duration::from_std(staleness_window)
                .unwrap_or_else(|_| chrono::Duration::seconds(30)),
        }
    }

    /// Subscribe to post-merge snapshots, one per discovery cycle.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<PresenceEntry>> {
        self.snapshots.subscribe()
    }

    /// Current entry list, ordered by address.
    pub async fn snapshot(&self) -> Vec<PresenceEntry> {
        let entries = self.entries.read().await;
        let mut snapshot: Vec<PresenceEntry> = entries.values().cloned().collect();
        snapshot.sort_by(|a, b| a.address.cmp(&b.address));
        snapshot
    }

    /// Merge one discovery cycle's resolved sightings into the cache and
    /// notify subscribers with the resulting snapshot.
    ///
    /// Every existing entry is first marked disconnected; sighted addresses
    /// are then updated in place (or inserted) with `last_seen = now`.
    /// Entries unseen for longer than the staleness window are evicted on
    /// every cycle, including zero-sighting cycles, whatever their connected
    /// flag says.
    pub async fn apply_cycle(
        &self,
        sightings: &[ResolvedSighting],
        now: DateTime<Utc>,
    ) -> Vec<PresenceEntry> {
        let mut entries = self.entries.write().await;

        for entry in entries.values_mut() {
            entry.connected = false;
        }

        for resolved in sightings {
            let sighting = &resolved.sighting;
            match entries.get_mut(&sighting.address) {
                Some(entry) => {
                    entry.display_name = sighting.display_name.clone();
                    entry.battery_level = sighting.battery_level;
                    entry.rssi_dbm = sighting.rssi_dbm;
                    entry.latitude = resolved.latitude;
                    entry.longitude = resolved.longitude;
                    entry.connected = true;
                    entry.last_seen = now;
                }
                None => {
                    entries.insert(
                        sighting.address.clone(),
                        PresenceEntry::from_sighting(
                            sighting,
                            resolved.latitude,
                            resolved.longitude,
                            now,
                        ),
                    );
                }
            }
        }

        let window = self.staleness_window;
        let before = entries.len();
        entries.retain(|_, entry| now.signed_duration_since(entry.last_seen) <= window);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "evicted stale presence entries");
        }

        let mut snapshot: Vec<PresenceEntry> = entries.values().cloned().collect();
        drop(entries);

        snapshot.sort_by(|a, b| a.address.cmp(&b.address));
        // Nobody listening is fine; snapshots are droppable.
        let _ = self.snapshots.send(snapshot.clone());
        snapshot
    }
}

/// Pick the device observers should focus on.
///
/// Among connected entries, the first whose display name contains one of the
/// device-class keywords (case-insensitive substring) wins; otherwise the
/// first connected entry in iteration order; with nothing connected there is
/// no selection.
pub fn select_active<'a>(
    entries: &'a [PresenceEntry],
    keywords: &[String],
) -> Option<&'a PresenceEntry> {
    let connected = || entries.iter().filter(|e| e.connected);
    connected()
        .find(|entry| {
            let name = entry.display_name.to_lowercase();
            keywords.iter().any(|k| name.contains(&k.to_lowercase()))
        })
        .or_else(|| connected().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sighting(address: &str, name: &str) -> ResolvedSighting {
        ResolvedSighting {
            sighting: Sighting {
                address: address.into(),
                display_name: name.into(),
                battery_level: 80,
                rssi_dbm: -60,
            },
            latitude: 40.7,
            longitude: -74.0,
        }
    }

    fn keywords() -> Vec<String> {
        vec!["drone".into(), "quadcopter".into(), "uav".into()]
    }

    #[tokio::test]
    async fn test_merge_inserts_new_entries() {
        let cache = PresenceCache::new(Duration::from_secs(30));
        let now = Utc::now();
        let snapshot = cache
            .apply_cycle(&[sighting("aa", "Drone One"), sighting("bb", "Headset")], now)
            .await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|e| e.connected && e.last_seen == now));
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let cache = PresenceCache::new(Duration::from_secs(30));
        let t1 = Utc::now();
        let first = cache.apply_cycle(&[sighting("aa", "Drone One")], t1).await;
        let t2 = t1 + chrono::Duration::seconds(2);
        let second = cache.apply_cycle(&[sighting("aa", "Drone One")], t2).await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].address, second[0].address);
        assert!(second[0].last_seen >= first[0].last_seen);
        assert!(first[0].connected && second[0].connected);
    }

    #[tokio::test]
    async fn test_empty_cycle_marks_all_disconnected_without_evicting() {
        let cache = PresenceCache::new(Duration::from_secs(30));
        let t1 = Utc::now();
        cache.apply_cycle(&[sighting("aa", "Drone One")], t1).await;

        let t2 = t1 + chrono::Duration::seconds(2);
        let snapshot = cache.apply_cycle(&[], t2).await;
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot[0].connected);
        assert_eq!(snapshot[0].last_seen, t1);
    }

    #[tokio::test]
    async fn test_eviction_after_staleness_window() {
        let cache = PresenceCache::new(Duration::from_secs(30));
        let t1 = Utc::now();
        cache.apply_cycle(&[sighting("aa", "Drone One")], t1).await;

        // 31 seconds of empty scans: gone, not merely flagged.
        let t2 = t1 + chrono::Duration::seconds(31);
        let snapshot = cache.apply_cycle(&[], t2).await;
        assert!(snapshot.is_empty());
        assert!(cache.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_eviction_applies_even_when_other_devices_are_sighted() {
        let cache = PresenceCache::new(Duration::from_secs(30));
        let t1 = Utc::now();
        cache.apply_cycle(&[sighting("aa", "Drone One")], t1).await;

        let t2 = t1 + chrono::Duration::seconds(31);
        let snapshot = cache.apply_cycle(&[sighting("bb", "Headset")], t2).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].address, "bb");
    }

    #[tokio::test]
    async fn test_resighting_refreshes_last_seen_before_eviction() {
        let cache = PresenceCache::new(Duration::from_secs(30));
        let t1 = Utc::now();
        cache.apply_cycle(&[sighting("aa", "Drone One")], t1).await;

        let t2 = t1 + chrono::Duration::seconds(29);
        cache.apply_cycle(&[sighting("aa", "Drone One")], t2).await;

        let t3 = t2 + chrono::Duration::seconds(29);
        let snapshot = cache.apply_cycle(&[], t3).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].last_seen, t2);
    }

    #[tokio::test]
    async fn test_subscribers_receive_post_merge_snapshot() {
        let cache = PresenceCache::new(Duration::from_secs(30));
        let mut rx = cache.subscribe();
        let now = Utc::now();
        cache.apply_cycle(&[sighting("aa", "Drone One")], now).await;

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].display_name, "Drone One");
    }

    #[tokio::test]
    async fn test_update_in_place_keeps_identity_and_updates_fields() {
        let cache = PresenceCache::new(Duration::from_secs(30));
        let t1 = Utc::now();
        cache.apply_cycle(&[sighting("aa", "Drone One")], t1).await;

        let mut renamed = sighting("aa", "Drone One Pro");
        renamed.sighting.battery_level = 42;
        renamed.latitude = 41.0;
        let t2 = t1 + chrono::Duration::seconds(2);
        let snapshot = cache.apply_cycle(&[renamed], t2).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].display_name, "Drone One Pro");
        assert_eq!(snapshot[0].battery_level, 42);
        assert_eq!(snapshot[0].latitude, 41.0);
    }

    #[test]
    fn test_select_prefers_keyword_match() {
        let now = Utc::now();
        let mut entries = vec![
            PresenceEntry::from_sighting(
                &Sighting {
                    address: "aa".into(),
                    display_name: "Wireless Headset".into(),
                    battery_level: 50,
                    rssi_dbm: -70,
                },
                0.0,
                0.0,
                now,
            ),
            PresenceEntry::from_sighting(
                &Sighting {
                    address: "bb".into(),
                    display_name: "Scout UAV Mk2".into(),
                    battery_level: 90,
                    rssi_dbm: -50,
                },
                0.0,
                0.0,
                now,
            ),
        ];
        let selected = select_active(&entries, &keywords()).unwrap();
        assert_eq!(selected.address, "bb");

        // Without a keyword match, the first connected entry wins.
        entries[1].display_name = "Tracker".into();
        let selected = select_active(&entries, &keywords()).unwrap();
        assert_eq!(selected.address, "aa");
    }

    #[test]
    fn test_select_none_when_nothing_connected() {
        let now = Utc::now();
        let mut entry = PresenceEntry::from_sighting(
            &Sighting {
                address: "aa".into(),
                display_name: "Drone One".into(),
                battery_level: 50,
                rssi_dbm: -70,
            },
            0.0,
            0.0,
            now,
        );
        entry.connected = false;
        assert!(select_active(&[entry], &keywords()).is_none());
    }
}
