//! Discovery cycle: scan, resolve locations, merge into the presence cache.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{PresenceEntry, Sighting};
use crate::services::presence::{PresenceCache, ResolvedSighting};
use crate::services::resolver::LocationResolver;

/// Errors the discovery collaborator can report.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan backend failed: {0}")]
    Backend(String),

    #[error("scanner is not configured")]
    NotConfigured,
}

/// External discovery collaborator producing raw sightings.
///
/// Best-effort: an empty result is a normal outcome.
#[async_trait::async_trait]
pub trait DeviceScanner: Send + Sync {
    async fn scan(&self) -> Result<Vec<Sighting>, ScanError>;
}

/// Runs one discovery cycle end to end.
pub struct DiscoveryService {
    scanner: Arc<dyn DeviceScanner>,
    resolver: Arc<LocationResolver>,
    cache: Arc<PresenceCache>,
}

impl DiscoveryService {
    pub fn new(
        scanner: Arc<dyn DeviceScanner>,
        resolver: Arc<LocationResolver>,
        cache: Arc<PresenceCache>,
    ) -> Self {
        Self {
            scanner,
            resolver,
            cache,
        }
    }

    /// Scan, attach a location to every sighting, merge into the cache, and
    /// return the post-merge snapshot (subscribers are notified by the
    /// cache). A failing scanner counts as zero sightings.
    pub async fn run_cycle(&self) -> Vec<PresenceEntry> {
        let sightings = match self.scanner.scan().await {
            Ok(sightings) => sightings,
            Err(err) => {
                warn!(error = %err, "device scan failed; treating as zero sightings");
                Vec::new()
            }
        };
        debug!(count = sightings.len(), "discovery scan completed");

        let mut resolved = Vec::with_capacity(sightings.len());
        for sighting in sightings {
            let estimate = self.resolver.resolve(&sighting.address).await;
            resolved.push(ResolvedSighting {
                latitude: estimate.latitude,
                longitude: estimate.longitude,
                sighting,
            });
        }

        self.cache.apply_cycle(&resolved, Utc::now()).await
    }
}
