//! Location estimate model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which positioning source produced an estimate.
///
/// Network-assisted positioning and wide-area survey triangulation both
/// report `Network`; they differ only in how the fix was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSourceTag {
    Gps,
    Network,
    Ip,
    CachedDrift,
    Synthetic,
}

impl LocationSourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSourceTag::Gps => "gps",
            LocationSourceTag::Network => "network",
            LocationSourceTag::Ip => "ip",
            LocationSourceTag::CachedDrift => "cached_drift",
            LocationSourceTag::Synthetic => "synthetic",
        }
    }
}

/// One location estimate with its error bound.
///
/// Transient: never persisted standalone; only the resolved coordinates end
/// up embedded in a presence entry or telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEstimate {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated error bound in meters; lower is better.
    pub accuracy_m: f64,
    pub source: LocationSourceTag,
    pub produced_at: DateTime<Utc>,
}

impl LocationEstimate {
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64, source: LocationSourceTag) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            source,
            produced_at: Utc::now(),
        }
    }

    /// True when `self` is a strictly tighter fix than `other`.
    pub fn improves_on(&self, other: &LocationEstimate) -> bool {
        self.accuracy_m < other.accuracy_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improves_on() {
        let fine = LocationEstimate::new(40.0, -74.0, 50.0, LocationSourceTag::Gps);
        let coarse = LocationEstimate::new(40.0, -74.0, 5000.0, LocationSourceTag::Ip);
        assert!(fine.improves_on(&coarse));
        assert!(!coarse.improves_on(&fine));
        assert!(!fine.improves_on(&fine));
    }

    #[test]
    fn test_tag_serialization() {
        assert_eq!(
            serde_json::to_string(&LocationSourceTag::CachedDrift).unwrap(),
            "\"cached_drift\""
        );
    }
}
