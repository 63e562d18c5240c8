//! Repository implementations.

pub mod device;
pub mod telemetry;

pub use device::DeviceRepository;
pub use telemetry::TelemetryRepository;
