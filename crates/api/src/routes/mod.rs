//! HTTP route handlers.

pub mod health;
pub mod presence;
pub mod telemetry;
pub mod ws;
