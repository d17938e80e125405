//! Address geocoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use imagery_common::{Coordinate, ImageryError, ImageryResult};

/// Resolves a free-text address to a coordinate.
#[async_trait]
pub trait GeocodeClient: Send + Sync {
    async fn resolve_address(&self, address: &str) -> ImageryResult<Coordinate>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Take the first result's location from a geocoding response body.
pub fn parse_geocode_response(body: &[u8]) -> ImageryResult<Coordinate> {
    let response: GeocodeResponse = serde_json::from_slice(body)?;

    let first = response.results.first().ok_or_else(|| {
        ImageryError::upstream(
            "geocode",
            format!(
                "no results (status {})",
                response.status.as_deref().unwrap_or("unknown")
            ),
        )
    })?;

    let loc = &first.geometry.location;
    Coordinate::new(loc.lat, loc.lng)
        .map_err(|e| ImageryError::upstream("geocode", e.to_string()))
}

/// Client for the Google Geocoding JSON API.
pub struct GoogleGeocoder {
    client: Client,
    url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> ImageryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageryError::upstream("geocode", format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl GeocodeClient for GoogleGeocoder {
    #[instrument(skip(self))]
    async fn resolve_address(&self, address: &str) -> ImageryResult<Coordinate> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ImageryError::upstream("geocode", e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(ImageryError::upstream(
                "geocode",
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ImageryError::upstream("geocode", e.without_url().to_string()))?;

        let coord = parse_geocode_response(&body)?;
        debug!(lat = coord.lat, lng = coord.lng, "Geocoded address");
        Ok(coord)
    }
}
