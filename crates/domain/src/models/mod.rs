//! Domain models.

pub mod device;
pub mod location;
pub mod presence;
pub mod telemetry;

pub use device::{Device, DeviceStatus};
pub use location::{LocationEstimate, LocationSourceTag};
pub use presence::{PresenceEntry, Sighting};
pub use telemetry::{TelemetryAccepted, TelemetryReading, TelemetryRecord};
