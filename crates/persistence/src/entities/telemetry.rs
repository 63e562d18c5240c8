//! Telemetry entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the telemetry_data table.
#[derive(Debug, Clone, FromRow)]
pub struct TelemetryEntity {
    pub id: i32,
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub battery_level: i32,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub heading: Option<f64>,
    pub status: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<TelemetryEntity> for domain::models::TelemetryRecord {
    fn from(entity: TelemetryEntity) -> Self {
        Self {
            device_id: entity.device_id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            battery_level: entity.battery_level,
            altitude: entity.altitude,
            speed: entity.speed,
            temperature: entity.temperature,
            humidity: entity.humidity,
            pressure: entity.pressure,
            heading: entity.heading,
            status: entity.status,
            timestamp: entity.timestamp,
        }
    }
}
