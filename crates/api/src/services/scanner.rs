//! Command-driven device scanner.
//!
//! The actual short-range radio enumeration is platform tooling; it sits
//! behind a configured command that prints one `name|instance_id` line per
//! visible device (optionally `name|instance_id|battery|rssi`). Adapter and
//! protocol-service entries are filtered out so only peripheral devices
//! surface as sightings. Battery and signal strength are derived
//! deterministically from the hardware address when the tooling does not
//! report them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use tracing::{debug, warn};

use domain::models::Sighting;
use domain::services::{DeviceScanner, ScanError};

lazy_static! {
    static ref MAC_RE: Regex = Regex::new(r"[0-9A-Fa-f]{12}").expect("valid MAC regex");
}

/// Names that identify the radio hardware itself rather than a peripheral.
const ADAPTER_KEYWORDS: &[&str] = &[
    "adapter",
    "realtek",
    "intel",
    "mediatek",
    "broadcom",
    "qualcomm",
    "generic attribute",
    "radio",
    "usb",
    "pci",
];

/// Names that identify protocol services rather than user devices.
const SYSTEM_KEYWORDS: &[&str] = &[
    "enumerator",
    "rfcomm",
    "protocol",
    "information service",
    "phonebook access",
    "avrcp transport",
];

pub struct CommandScanner {
    command: String,
}

impl CommandScanner {
    pub fn new(command: String) -> Self {
        Self { command }
    }

    fn is_adapter(name: &str) -> bool {
        let lower = name.to_lowercase();
        ADAPTER_KEYWORDS.iter().any(|k| lower.contains(k))
    }

    fn is_system_device(name: &str) -> bool {
        let lower = name.to_lowercase();
        SYSTEM_KEYWORDS.iter().any(|k| lower.contains(k))
    }

    /// A usable name has at least two alphanumeric characters and is not a
    /// truncation artifact.
    fn is_valid_name(name: &str) -> bool {
        name.len() >= 4
            && !name.contains("...")
            && name.chars().filter(|c| c.is_alphanumeric()).count() >= 2
    }

    /// Pull a MAC-style address out of the instance id, or derive a stable
    /// stand-in from its hash when none is embedded.
    fn extract_address(instance_id: &str) -> String {
        if let Some(found) = MAC_RE.find(instance_id) {
            let mac = found.as_str().to_uppercase();
            return mac
                .as_bytes()
                .chunks(2)
                .map(|pair| std::str::from_utf8(pair).unwrap_or("00"))
                .collect::<Vec<_>>()
                .join(":");
        }

        let mut rng = StdRng::seed_from_u64(hash_of(instance_id));
        let octets: Vec<String> = (0..6).map(|_| format!("{:02X}", rng.gen::<u8>())).collect();
        octets.join(":")
    }

    /// Battery level 70-99, stable per address.
    fn simulate_battery(address: &str) -> i32 {
        let mut rng = StdRng::seed_from_u64(hash_of(address));
        rng.gen_range(70..100)
    }

    /// RSSI in dBm, reseeded every 10 seconds so the value wanders the way a
    /// real signal does, clamped to [-100, -30].
    fn simulate_rssi(address: &str) -> i32 {
        let window = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() / 10)
            .unwrap_or(0);
        let mut rng = StdRng::seed_from_u64(hash_of(address).wrapping_add(window));
        let base = rng.gen_range(-90..-40);
        let variation = rng.gen_range(-5..5);
        (base + variation).clamp(-100, -30)
    }

    fn parse_line(line: &str) -> Option<Sighting> {
        let line = line.trim();
        if line.is_empty() || !line.contains('|') {
            return None;
        }

        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        let (name, instance_id) = match parts.as_slice() {
            [name, instance_id, ..] => (*name, *instance_id),
            _ => return None,
        };

        if !Self::is_valid_name(name) {
            debug!(name, "skipping invalid device name");
            return None;
        }
        if Self::is_adapter(name) || Self::is_system_device(name) {
            debug!(name, "skipping system device");
            return None;
        }

        let address = Self::extract_address(instance_id);
        let battery_level = parts
            .get(2)
            .and_then(|p| p.parse().ok())
            .filter(|b| (0..=100).contains(b))
            .unwrap_or_else(|| Self::simulate_battery(&address));
        let rssi_dbm = parts
            .get(3)
            .and_then(|p| p.parse().ok())
            .filter(|r| *r != 0)
            .unwrap_or_else(|| Self::simulate_rssi(&address));

        Some(Sighting {
            address,
            display_name: name.to_string(),
            battery_level,
            rssi_dbm,
        })
    }
}

fn hash_of(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[async_trait::async_trait]
impl DeviceScanner for CommandScanner {
    async fn scan(&self) -> Result<Vec<Sighting>, ScanError> {
        if self.command.is_empty() {
            // No scan backend configured: a permanently empty neighborhood.
            return Ok(Vec::new());
        }

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await
            .map_err(|err| ScanError::Backend(err.to_string()))?;

        if !output.status.success() {
            return Err(ScanError::Backend(format!(
                "scan command exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut sightings: Vec<Sighting> = Vec::new();
        for line in stdout.lines() {
            if let Some(sighting) = Self::parse_line(line) {
                if sightings.iter().any(|s| s.address == sighting.address) {
                    continue;
                }
                debug!(
                    name = %sighting.display_name,
                    address = %sighting.address,
                    rssi = sighting.rssi_dbm,
                    "found device"
                );
                sightings.push(sighting);
            }
        }

        if sightings.is_empty() && !stdout.trim().is_empty() {
            warn!("scan output contained no usable device lines");
        }
        Ok(sightings)
    }
}
