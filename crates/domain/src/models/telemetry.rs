//! Telemetry domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents one persisted telemetry reading.
///
/// Immutable once written; the timestamp is server-assigned when the inbound
/// payload does not carry one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub battery_level: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Inbound telemetry payload as it appears on the wire.
///
/// One flat JSON object per message. `deviceId`, `latitude`, `longitude` and
/// a battery value are required; battery is accepted under either key
/// `batteryPercent` (device push convention) or `batteryLevel` (snapshot
/// convention).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    #[validate(length(min = 1, max = 50, message = "deviceId must be 1-50 characters"))]
    pub device_id: String,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[serde(alias = "batteryLevel")]
    #[validate(custom(function = "shared::validation::validate_battery_level"))]
    pub battery_percent: i32,

    pub altitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_speed"))]
    pub speed: Option<f64>,

    pub temperature: Option<f64>,

    pub humidity: Option<f64>,

    pub pressure: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_heading"))]
    pub heading: Option<f64>,

    #[validate(length(max = 20, message = "status must be at most 20 characters"))]
    pub status: Option<String>,
}

impl TelemetryReading {
    /// Convert into a record ready for persistence, stamping the creation
    /// instant.
    pub fn into_record(self, now: DateTime<Utc>) -> TelemetryRecord {
        TelemetryRecord {
            device_id: self.device_id,
            latitude: self.latitude,
            longitude: self.longitude,
            battery_level: self.battery_percent,
            altitude: self.altitude,
            speed: self.speed,
            temperature: self.temperature,
            humidity: self.humidity,
            pressure: self.pressure,
            heading: self.heading,
            status: self.status,
            timestamp: now,
        }
    }
}

/// Response payload for the REST telemetry ingress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryAccepted {
    pub accepted: bool,
    pub device_id: String,
}
