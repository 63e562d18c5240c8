//! Telemetry repository for database operations.

use sqlx::PgPool;

use crate::entities::TelemetryEntity;
use domain::models::TelemetryRecord;

/// Repository for telemetry-related database operations.
#[derive(Clone)]
pub struct TelemetryRepository {
    pool: PgPool,
}

impl TelemetryRepository {
    /// Creates a new TelemetryRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert one telemetry row.
    pub async fn insert(&self, record: &TelemetryRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO telemetry_data
                (device_id, timestamp, latitude, longitude, battery_level,
                 altitude, speed, temperature, humidity, pressure, heading, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&record.device_id)
        .bind(record.timestamp)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.battery_level)
        .bind(record.altitude)
        .bind(record.speed)
        .bind(record.temperature)
        .bind(record.humidity)
        .bind(record.pressure)
        .bind(record.heading)
        .bind(&record.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent row for a device, if any.
    pub async fn latest_for_device(
        &self,
        device_id: &str,
    ) -> Result<Option<TelemetryEntity>, sqlx::Error> {
        sqlx::query_as::<_, TelemetryEntity>(
            r#"
            SELECT id, device_id, latitude, longitude, battery_level,
                   altitude, speed, temperature, humidity, pressure, heading,
                   status, timestamp
            FROM telemetry_data
            WHERE device_id = $1
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Up to `limit` rows for a device, newest first.
    pub async fn history(
        &self,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<TelemetryEntity>, sqlx::Error> {
        sqlx::query_as::<_, TelemetryEntity>(
            r#"
            SELECT id, device_id, latitude, longitude, battery_level,
                   altitude, speed, temperature, humidity, pressure, heading,
                   status, timestamp
            FROM telemetry_data
            WHERE device_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
