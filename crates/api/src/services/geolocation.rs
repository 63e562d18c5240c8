//! HTTP-backed positioning sources.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use domain::models::{LocationEstimate, LocationSourceTag};
use domain::services::{LocationSource, SourceError};

/// Coarse network-address geolocation against an ip-api style endpoint.
///
/// City-level at best, so the fix carries a fixed 5km accuracy radius.
pub struct IpGeolocationSource {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}

impl IpGeolocationSource {
    pub fn new(url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl LocationSource for IpGeolocationSource {
    fn tag(&self) -> LocationSourceTag {
        LocationSourceTag::Ip
    }

    fn escalation_threshold_m(&self) -> f64 {
        1000.0
    }

    async fn lookup(&self) -> Result<Option<LocationEstimate>, SourceError> {
        if self.url.is_empty() {
            return Err(SourceError::NotConfigured);
        }

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| SourceError::Backend(err.to_string()))?;

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|err| SourceError::Backend(err.to_string()))?;

        if body.status != "success" || (body.lat == 0.0 && body.lon == 0.0) {
            return Ok(None);
        }

        debug!(lat = body.lat, lon = body.lon, "IP geolocation obtained");
        Ok(Some(LocationEstimate::new(
            body.lat,
            body.lon,
            5000.0,
            LocationSourceTag::Ip,
        )))
    }
}

/// Network-assisted positioning against a geolocation API.
///
/// Uses the common `considerIp` request shape; the endpoint triangulates
/// from whatever network context it can see and reports its own accuracy.
pub struct GeolocationApiSource {
    client: Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GeolocationResponse {
    location: GeolocationPoint,
    accuracy: f64,
}

#[derive(Debug, Deserialize)]
struct GeolocationPoint {
    lat: f64,
    lng: f64,
}

impl GeolocationApiSource {
    pub fn new(url: String, api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl LocationSource for GeolocationApiSource {
    fn tag(&self) -> LocationSourceTag {
        LocationSourceTag::Network
    }

    fn escalation_threshold_m(&self) -> f64 {
        100.0
    }

    async fn lookup(&self) -> Result<Option<LocationEstimate>, SourceError> {
        if self.url.is_empty() {
            return Err(SourceError::NotConfigured);
        }

        let mut request = self.client.post(&self.url);
        if !self.api_key.is_empty() {
            request = request.query(&[("key", self.api_key.as_str())]);
        }

        let response = request
            .json(&serde_json::json!({ "considerIp": true }))
            .send()
            .await
            .map_err(|err| SourceError::Backend(err.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Backend(format!(
                "geolocation API returned {}",
                response.status()
            )));
        }

        let body: GeolocationResponse = response
            .json()
            .await
            .map_err(|err| SourceError::Backend(err.to_string()))?;

        debug!(
            lat = body.location.lat,
            lon = body.location.lng,
            accuracy = body.accuracy,
            "network-assisted fix obtained"
        );
        Ok(Some(LocationEstimate::new(
            body.location.lat,
            body.location.lng,
            body.accuracy,
            LocationSourceTag::Network,
        )))
    }
}
