//! Multi-source location resolution.
//!
//! Sources form an ordered chain with accuracy-based arbitration: each source
//! is consulted only while the best fix so far is coarser than that source's
//! escalation threshold, and the reducer always keeps the tightest estimate
//! seen. When no source yields anything, the resolver falls back to the
//! cached estimate with simulated drift, and finally to a deterministic
//! synthetic point, so a resolution never comes back empty.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{LocationEstimate, LocationSourceTag};

/// Errors a positioning source can report.
///
/// All of them mean the same thing to the chain: this source is unavailable
/// right now, move on.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source backend failed: {0}")]
    Backend(String),

    #[error("source is not configured")]
    NotConfigured,
}

/// One positioning source in the fallback chain.
#[async_trait::async_trait]
pub trait LocationSource: Send + Sync {
    /// Tag reported on estimates from this source.
    fn tag(&self) -> LocationSourceTag;

    /// Consult this source only when nothing has been found yet, or the
    /// best-so-far accuracy radius exceeds this many meters.
    fn escalation_threshold_m(&self) -> f64;

    /// Produce an estimate, or `None` when the source has nothing to offer.
    async fn lookup(&self) -> Result<Option<LocationEstimate>, SourceError>;
}

/// Resolver tuning knobs.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Upper bound on a single source lookup.
    pub source_timeout: Duration,
    /// Anchor point for survey and synthetic estimates.
    pub anchor_latitude: f64,
    pub anchor_longitude: f64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(3),
            anchor_latitude: 40.7128,
            anchor_longitude: -74.0060,
        }
    }
}

/// Resolves one best-available location estimate per device key.
pub struct LocationResolver {
    sources: Vec<Arc<dyn LocationSource>>,
    cache: RwLock<HashMap<String, LocationEstimate>>,
    settings: ResolverSettings,
}

impl LocationResolver {
    pub fn new(sources: Vec<Arc<dyn LocationSource>>, settings: ResolverSettings) -> Self {
        Self {
            sources,
            cache: RwLock::new(HashMap::new()),
            settings,
        }
    }

    /// Walk the source chain and return the single best estimate for
    /// `device_key`. Always yields exactly one estimate.
    pub async fn resolve(&self, device_key: &str) -> LocationEstimate {
        let mut best: Option<LocationEstimate> = None;

        for source in &self.sources {
            let consult = match &best {
                None => true,
                Some(found) => found.accuracy_m > source.escalation_threshold_m(),
            };
            if !consult {
                continue;
            }

            let tag = source.tag();
            match tokio::time::timeout(self.settings.source_timeout, source.lookup()).await {
                Ok(Ok(Some(estimate))) => {
                    let keep = best
                        .as_ref()
                        .map_or(true, |found| estimate.improves_on(found));
                    if keep {
                        debug!(
                            source = tag.as_str(),
                            accuracy_m = estimate.accuracy_m,
                            "location candidate accepted"
                        );
                        best = Some(estimate);
                    }
                }
                Ok(Ok(None)) => {
                    debug!(source = tag.as_str(), "location source had no fix");
                }
                Ok(Err(err)) => {
                    debug!(source = tag.as_str(), error = %err, "location source unavailable");
                }
                Err(_) => {
                    debug!(
                        source = tag.as_str(),
                        timeout_ms = self.settings.source_timeout.as_millis() as u64,
                        "location source timed out"
                    );
                }
            }
        }

        let estimate = match best {
            Some(estimate) => estimate,
            None => match self.cached_with_drift(device_key).await {
                Some(estimate) => estimate,
                None => self.synthetic(device_key),
            },
        };

        self.cache
            .write()
            .await
            .insert(device_key.to_string(), estimate.clone());
        estimate
    }

    /// Last resolved estimate for a device, if any.
    pub async fn cached(&self, device_key: &str) -> Option<LocationEstimate> {
        self.cache.read().await.get(device_key).cloned()
    }

    /// Drop all cached estimates.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Previous estimate nudged by a bounded random offset (~50m per axis)
    /// with slightly degraded accuracy, simulating device motion.
    async fn cached_with_drift(&self, device_key: &str) -> Option<LocationEstimate> {
        let cached = self.cache.read().await.get(device_key).cloned()?;
        let mut rng = rand::thread_rng();
        let delta_lat: f64 = rng.gen_range(-0.0005..0.0005);
        let delta_lon: f64 = rng.gen_range(-0.0005..0.0005);
        Some(LocationEstimate::new(
            cached.latitude + delta_lat,
            cached.longitude + delta_lon,
            cached.accuracy_m + 10.0,
            LocationSourceTag::CachedDrift,
        ))
    }

    /// Deterministic pseudo-random point within ~10km of the anchor, seeded
    /// from the device key so the same device always lands on the same spot.
    fn synthetic(&self, device_key: &str) -> LocationEstimate {
        let digest = Sha256::digest(device_key.as_bytes());
        let seed = u64::from_le_bytes(digest[..8].try_into().unwrap_or([0u8; 8]));
        let mut rng = StdRng::seed_from_u64(seed);

        let lat_offset: f64 = rng.gen_range(-0.05..0.05);
        let lon_offset: f64 = rng.gen_range(-0.05..0.05);
        LocationEstimate::new(
            self.settings.anchor_latitude + lat_offset,
            self.settings.anchor_longitude + lon_offset,
            50.0,
            LocationSourceTag::Synthetic,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        tag: LocationSourceTag,
        threshold: f64,
        result: Option<(f64, f64, f64)>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeSource {
        fn new(tag: LocationSourceTag, threshold: f64, result: Option<(f64, f64, f64)>) -> Self {
            Self {
                tag,
                threshold,
                result,
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl LocationSource for FakeSource {
        fn tag(&self) -> LocationSourceTag {
            self.tag
        }

        fn escalation_threshold_m(&self) -> f64 {
            self.threshold
        }

        async fn lookup(&self) -> Result<Option<LocationEstimate>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self
                .result
                .map(|(lat, lon, acc)| LocationEstimate::new(lat, lon, acc, self.tag)))
        }
    }

    fn settings() -> ResolverSettings {
        ResolverSettings {
            source_timeout: Duration::from_millis(200),
            ..ResolverSettings::default()
        }
    }

    #[tokio::test]
    async fn test_precise_gps_short_circuits_chain() {
        let gps = Arc::new(FakeSource::new(
            LocationSourceTag::Gps,
            0.0,
            Some((40.0, -74.0, 20.0)),
        ));
        let network = Arc::new(FakeSource::new(
            LocationSourceTag::Network,
            100.0,
            Some((41.0, -75.0, 150.0)),
        ));
        let ip = Arc::new(FakeSource::new(
            LocationSourceTag::Ip,
            1000.0,
            Some((42.0, -76.0, 5000.0)),
        ));
        let resolver = LocationResolver::new(
            vec![gps.clone(), network.clone(), ip.clone()],
            settings(),
        );

        let estimate = resolver.resolve("dev").await;
        assert_eq!(estimate.source, LocationSourceTag::Gps);
        assert_eq!(estimate.accuracy_m, 20.0);
        assert_eq!(gps.calls(), 1);
        assert_eq!(network.calls(), 0);
        assert_eq!(ip.calls(), 0);
    }

    #[tokio::test]
    async fn test_coarse_fix_escalates_but_never_degrades() {
        // GPS yields a coarse 500m fix; network is consulted and improves it;
        // IP is skipped because 120m does not exceed its 1000m threshold.
        let gps = Arc::new(FakeSource::new(
            LocationSourceTag::Gps,
            0.0,
            Some((40.0, -74.0, 500.0)),
        ));
        let network = Arc::new(FakeSource::new(
            LocationSourceTag::Network,
            100.0,
            Some((40.1, -74.1, 120.0)),
        ));
        let ip = Arc::new(FakeSource::new(
            LocationSourceTag::Ip,
            1000.0,
            Some((42.0, -76.0, 5000.0)),
        ));
        let resolver = LocationResolver::new(
            vec![gps.clone(), network.clone(), ip.clone()],
            settings(),
        );

        let estimate = resolver.resolve("dev").await;
        assert_eq!(estimate.source, LocationSourceTag::Network);
        assert_eq!(estimate.accuracy_m, 120.0);
        assert_eq!(ip.calls(), 0);
    }

    #[tokio::test]
    async fn test_later_coarser_candidate_is_discarded() {
        let gps = Arc::new(FakeSource::new(
            LocationSourceTag::Gps,
            0.0,
            Some((40.0, -74.0, 150.0)),
        ));
        // Consulted (150 > 100) but strictly worse; the fold must keep GPS.
        let network = Arc::new(FakeSource::new(
            LocationSourceTag::Network,
            100.0,
            Some((41.0, -75.0, 400.0)),
        ));
        let resolver = LocationResolver::new(vec![gps, network.clone()], settings());

        let estimate = resolver.resolve("dev").await;
        assert_eq!(estimate.source, LocationSourceTag::Gps);
        assert_eq!(estimate.accuracy_m, 150.0);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable_not_fatal() {
        let gps = Arc::new(
            FakeSource::new(LocationSourceTag::Gps, 0.0, Some((40.0, -74.0, 20.0)))
                .slow(Duration::from_secs(5)),
        );
        let network = Arc::new(FakeSource::new(
            LocationSourceTag::Network,
            100.0,
            Some((40.1, -74.1, 180.0)),
        ));
        let resolver = LocationResolver::new(vec![gps, network], settings());

        let estimate = resolver.resolve("dev").await;
        assert_eq!(estimate.source, LocationSourceTag::Network);
    }

    #[tokio::test]
    async fn test_synthetic_fallback_is_deterministic() {
        let resolver = LocationResolver::new(vec![], settings());
        let first = resolver.synthetic("Drone-Alpha-001");
        let second = resolver.synthetic("Drone-Alpha-001");
        assert_eq!(first.latitude, second.latitude);
        assert_eq!(first.longitude, second.longitude);
        assert_eq!(first.source, LocationSourceTag::Synthetic);

        let other = resolver.synthetic("Drone-Beta-002");
        assert!(first.latitude != other.latitude || first.longitude != other.longitude);
    }

    #[tokio::test]
    async fn test_synthetic_stays_near_anchor() {
        let resolver = LocationResolver::new(vec![], settings());
        let estimate = resolver.resolve("some-device").await;
        assert!((estimate.latitude - 40.7128).abs() <= 0.05);
        assert!((estimate.longitude - -74.0060).abs() <= 0.05);
        assert_eq!(estimate.accuracy_m, 50.0);
    }

    #[tokio::test]
    async fn test_cached_drift_used_once_sources_disappear() {
        let gps = Arc::new(FakeSource::new(
            LocationSourceTag::Gps,
            0.0,
            Some((40.0, -74.0, 20.0)),
        ));
        let resolver = LocationResolver::new(vec![gps], settings());
        let first = resolver.resolve("dev").await;
        assert_eq!(first.source, LocationSourceTag::Gps);

        // Same device, sources gone: drift off the cached fix instead of
        // jumping to the synthetic point.
        let resolver_dry = LocationResolver {
            sources: vec![],
            cache: RwLock::new(HashMap::from([("dev".to_string(), first.clone())])),
            settings: settings(),
        };
        let second = resolver_dry.resolve("dev").await;
        assert_eq!(second.source, LocationSourceTag::CachedDrift);
        assert!((second.latitude - first.latitude).abs() <= 0.0005);
        assert!((second.longitude - first.longitude).abs() <= 0.0005);
        assert_eq!(second.accuracy_m, first.accuracy_m + 10.0);
    }

    #[tokio::test]
    async fn test_resolution_updates_cache() {
        let gps = Arc::new(FakeSource::new(
            LocationSourceTag::Gps,
            0.0,
            Some((40.0, -74.0, 20.0)),
        ));
        let resolver = LocationResolver::new(vec![gps], settings());
        assert!(resolver.cached("dev").await.is_none());
        resolver.resolve("dev").await;
        assert!(resolver.cached("dev").await.is_some());

        resolver.clear_cache().await;
        assert!(resolver.cached("dev").await.is_none());
    }
}
