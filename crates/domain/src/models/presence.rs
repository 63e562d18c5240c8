//! Presence model: raw sightings and cache entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw discovery result before location resolution.
///
/// The address is the stable hardware identifier (MAC-style), distinct from
/// the logical device id used on the telemetry wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sighting {
    pub address: String,
    pub display_name: String,
    pub battery_level: i32,
    /// Signal strength in dBm (-100 very far .. -30 very close).
    pub rssi_dbm: i32,
}

/// One entry in the presence cache.
///
/// Owned exclusively by the presence cache; mutated only by the discovery
/// cycle. An entry older than the staleness window is removed, not merely
/// flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub device_id: String,
    pub display_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub battery_level: i32,
    pub rssi_dbm: i32,
    pub connected: bool,
    pub last_seen: DateTime<Utc>,
}

impl PresenceEntry {
    /// Build a fresh entry from a resolved sighting.
    pub fn from_sighting(
        sighting: &Sighting,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: sighting.address.clone(),
            display_name: sighting.display_name.clone(),
            address: sighting.address.clone(),
            latitude,
            longitude,
            battery_level: sighting.battery_level,
            rssi_dbm: sighting.rssi_dbm,
            connected: true,
            last_seen: now,
        }
    }
}
