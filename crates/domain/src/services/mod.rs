//! Core domain services.

pub mod discovery;
pub mod presence;
pub mod resolver;

pub use discovery::{DeviceScanner, DiscoveryService, ScanError};
pub use presence::{select_active, PresenceCache, ResolvedSighting};
pub use resolver::{LocationResolver, LocationSource, ResolverSettings, SourceError};
