//! Client for the remote JPEG2000 decode service.
//!
//! The service downloads a band file, decodes it at the requested resolution
//! level and returns the pixel matrix as JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use imagery_common::{ImageryError, ImageryResult};

use crate::intensity::{representative_intensity, RasterShape};

/// Decodes a band file into a pixel-intensity matrix.
#[async_trait]
pub trait DecodeClient: Send + Sync {
    /// Decode the object at `path` (bucket-relative) at `resolution_level`.
    async fn decode(&self, path: &str, resolution_level: i32) -> ImageryResult<DecodedRaster>;
}

/// Request body sent to the decode service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecodeRequest {
    pub path: String,
    pub rlevel: i32,
}

/// Response body returned by the decode service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecodedRaster {
    #[serde(rename = "img_data")]
    pub matrix: Vec<Vec<i64>>,
    pub shape: Vec<usize>,
    #[serde(default)]
    pub time_download: f64,
    #[serde(default)]
    pub time_processing: f64,
}

impl DecodedRaster {
    /// Build a raster whose declared shape matches the matrix.
    pub fn from_matrix(matrix: Vec<Vec<i64>>) -> Self {
        let rows = matrix.len();
        let cols = matrix.first().map_or(0, |r| r.len());
        Self {
            matrix,
            shape: vec![rows, cols],
            time_download: 0.0,
            time_processing: 0.0,
        }
    }

    /// Representative intensity of this raster, see [`representative_intensity`].
    pub fn representative_intensity(&self, cap: Option<i64>) -> ImageryResult<f64> {
        let shape = RasterShape::from_dims(&self.shape)?;
        representative_intensity(&self.matrix, shape, cap)
    }
}

/// Configuration for the HTTP decode client.
#[derive(Debug, Clone)]
pub struct DecodeConfig {
    /// Endpoint accepting `POST {"path", "rlevel"}`
    pub url: String,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            url: "http://35.227.24.82/api/jp2".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Decode client talking JSON over HTTP.
pub struct HttpDecodeClient {
    client: Client,
    url: String,
}

impl HttpDecodeClient {
    pub fn new(config: &DecodeConfig) -> ImageryResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ImageryError::upstream("decode", format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl DecodeClient for HttpDecodeClient {
    #[instrument(skip(self))]
    async fn decode(&self, path: &str, resolution_level: i32) -> ImageryResult<DecodedRaster> {
        let request = DecodeRequest {
            path: path.to_string(),
            rlevel: resolution_level,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ImageryError::upstream("decode", e.to_string()))?;

        if !response.status().is_success() {
            return Err(ImageryError::upstream(
                "decode",
                format!("HTTP {} for {}", response.status(), path),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ImageryError::upstream("decode", e.to_string()))?;
        let raster: DecodedRaster = serde_json::from_slice(&body)?;

        debug!(
            shape = ?raster.shape,
            time_download = raster.time_download,
            time_processing = raster.time_processing,
            "Decoded band file"
        );

        Ok(raster)
    }
}
