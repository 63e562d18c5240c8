//! Shared utilities for the Device Monitor backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Range validation for telemetry fields (coordinates, battery, heading)

pub mod validation;
