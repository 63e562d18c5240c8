//! Device Monitor API library.
//!
//! Exposed as a library so integration tests can assemble the full
//! application in-process.

pub mod app;
pub mod config;
pub mod error;
pub mod hub;
pub mod jobs;
pub mod middleware;
pub mod observer;
pub mod routes;
pub mod services;
