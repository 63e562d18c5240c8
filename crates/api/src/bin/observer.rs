//! Headless observer: connects to the hub and logs live readings.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use device_monitor_api::config::Config;
use device_monitor_api::middleware::logging::init_logging;
use device_monitor_api::observer::{ObserverController, ReconnectPolicy, WsConnector};
use domain::models::TelemetryReading;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    init_logging(&config.logging);

    let policy = ReconnectPolicy {
        delay: std::time::Duration::from_secs(config.observer.reconnect_delay_secs),
        max_attempts: config.observer.max_reconnect_attempts,
    };
    info!(url = %config.observer.url, "starting observer");

    let mut handle =
        ObserverController::spawn(Arc::new(WsConnector), config.observer.url.clone(), policy);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            state = handle.state.changed() => {
                if state.is_err() {
                    break;
                }
                info!(state = ?*handle.state.borrow(), "connection state changed");
            }
            reading = handle.readings.recv() => {
                let Some(text) = reading else { break };
                match serde_json::from_str::<TelemetryReading>(&text) {
                    Ok(reading) => info!(
                        device = %reading.device_id,
                        latitude = reading.latitude,
                        longitude = reading.longitude,
                        battery = reading.battery_percent,
                        "telemetry update"
                    ),
                    Err(err) => info!(error = %err, raw = %text, "unparseable broadcast"),
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
