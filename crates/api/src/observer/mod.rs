//! Observer-side client: connection transport and reconnection control.

pub mod connector;
pub mod controller;

pub use connector::{ObserverConnection, ObserverConnector, ObserverError, WsConnector};
pub use controller::{ObserverController, ObserverHandle, ObserverState, ReconnectPolicy};
