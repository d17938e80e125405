//! Bounded, retrying resolution of band references to intensities.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use imagery_common::{ImageryError, ImageryResult};
use storage::ScenePath;

use crate::decode::{DecodeClient, DecodedRaster};

/// Retry policy for decode calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry (doubles each retry)
    pub initial_delay: Duration,
    /// Maximum retry delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Resolves band-file references to representative intensities.
///
/// All decode calls made through one resolver share a semaphore, so the
/// number of in-flight requests to the decode service stays bounded across
/// concurrent rankings.
pub struct IntensityResolver {
    decoder: Arc<dyn DecodeClient>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    retry: RetryPolicy,
    resolution_level: i32,
}

impl IntensityResolver {
    pub fn new(
        decoder: Arc<dyn DecodeClient>,
        max_concurrent: usize,
        retry: RetryPolicy,
        resolution_level: i32,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            decoder,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            retry,
            resolution_level,
        }
    }

    /// Maximum number of concurrent decode calls.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Decode `reference` and reduce it to its representative intensity.
    #[instrument(skip(self))]
    pub async fn resolve(&self, reference: &str, cap: Option<i64>) -> ImageryResult<f64> {
        let path = ScenePath::parse(reference)?.path;
        let raster = self.decode_with_retry(&path).await?;
        raster.representative_intensity(cap)
    }

    async fn decode_with_retry(&self, path: &str) -> ImageryResult<DecodedRaster> {
        let mut attempt = 0;
        let mut delay = self.retry.initial_delay;

        loop {
            let result = {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|e| ImageryError::upstream("decode", e.to_string()))?;
                counter!("imagery_decode_calls_total").increment(1);
                self.decoder.decode(path, self.resolution_level).await
            };

            match result {
                Ok(raster) => return Ok(raster),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        error = %e,
                        retry = attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Decode failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.retry.max_delay);
                }
                Err(e) => {
                    counter!("imagery_decode_failures_total").increment(1);
                    return Err(e);
                }
            }
        }
    }
}
