//! Device entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the devices table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceEntity {
    pub id: i32,
    pub device_id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DeviceEntity> for domain::models::Device {
    fn from(entity: DeviceEntity) -> Self {
        let status = match entity.status.as_deref() {
            Some("INACTIVE") => domain::models::DeviceStatus::Inactive,
            _ => domain::models::DeviceStatus::Active,
        };
        Self {
            name: entity.name.unwrap_or_else(|| entity.device_id.clone()),
            device_id: entity.device_id,
            status,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_name_falls_back_to_device_id() {
        let entity = DeviceEntity {
            id: 1,
            device_id: "Drone-Alpha-001".into(),
            name: None,
            model: None,
            status: Some("ACTIVE".into()),
            created_at: Utc::now(),
        };
        let device: domain::models::Device = entity.into();
        assert_eq!(device.name, "Drone-Alpha-001");
        assert_eq!(device.status, domain::models::DeviceStatus::Active);
    }
}
