//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod device;
pub mod telemetry;

pub use device::DeviceEntity;
pub use telemetry::TelemetryEntity;
