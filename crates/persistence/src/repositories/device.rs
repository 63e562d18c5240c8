//! Device repository for database operations.

use sqlx::PgPool;

use crate::entities::DeviceEntity;

/// Repository for device-related database operations.
#[derive(Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    /// Creates a new DeviceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert the device row if it does not exist yet.
    ///
    /// Lazy registration on first telemetry write: the name defaults to the
    /// device id and existing rows are never updated.
    pub async fn ensure_device(&self, device_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO devices (device_id, name, status)
            VALUES ($1, $1, 'ACTIVE')
            ON CONFLICT (device_id) DO NOTHING
            "#,
        )
        .bind(device_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Find a device by its identifier.
    pub async fn find_by_device_id(
        &self,
        device_id: &str,
    ) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT id, device_id, name, model, status, created_at
            FROM devices
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
    }
}
