//! Domain models and core services for the Device Monitor backend.
//!
//! Contains the wire/persistence data model (telemetry, devices, presence)
//! and the transport-free core logic: the presence cache, the multi-source
//! location resolver, and the discovery cycle that ties them together.
//! External capabilities (device scanning, positioning backends) are modeled
//! as traits so the core is testable with fakes.

pub mod models;
pub mod services;
