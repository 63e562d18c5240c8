//! Periodic presence discovery job.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use domain::services::{select_active, DiscoveryService};

use super::scheduler::{Job, JobFrequency};
use crate::hub::TelemetryHub;

/// Drives one discovery cycle per tick: scan, resolve, merge, notify.
///
/// With forwarding enabled, the selected device's reading is relayed through
/// the hub so WebSocket observers see presence-derived updates alongside
/// device pushes.
pub struct DiscoveryJob {
    service: Arc<DiscoveryService>,
    interval_secs: u64,
    forward: Option<Forwarder>,
}

struct Forwarder {
    hub: Arc<TelemetryHub>,
    keywords: Vec<String>,
}

impl DiscoveryJob {
    pub fn new(service: Arc<DiscoveryService>, interval_secs: u64) -> Self {
        Self {
            service,
            interval_secs,
            forward: None,
        }
    }

    /// Relay the selected device through `hub` after each cycle.
    pub fn with_forwarding(mut self, hub: Arc<TelemetryHub>, keywords: Vec<String>) -> Self {
        self.forward = Some(Forwarder { hub, keywords });
        self
    }
}

#[async_trait::async_trait]
impl Job for DiscoveryJob {
    fn name(&self) -> &'static str {
        "presence_discovery"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let snapshot = self.service.run_cycle().await;

        if let Some(forward) = &self.forward {
            if let Some(selected) = select_active(&snapshot, &forward.keywords) {
                let payload = json!({
                    "deviceId": selected.display_name,
                    "latitude": selected.latitude,
                    "longitude": selected.longitude,
                    "batteryPercent": selected.battery_level,
                })
                .to_string();

                if let Err(err) = forward.hub.publish(&payload).await {
                    // Shouldn't happen for a payload we built ourselves, but
                    // a forwarding failure must not fail the cycle.
                    warn!(error = %err, "failed to forward selected device reading");
                }
            }
        }

        Ok(())
    }
}
