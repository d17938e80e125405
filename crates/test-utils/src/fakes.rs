//! Deterministic in-memory stand-ins for the external collaborators.
//!
//! Every fake records the calls it receives so tests can assert on what was
//! (or was not) asked of the outside world.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use imagery_common::{ImageryError, ImageryResult};
use ranking::{DecodeClient, DecodedRaster};
use storage::{CatalogClient, ListingClient, Scene, SceneQuery};

use crate::fixtures::decode_path;

/// Injected failure for one decode path.
#[derive(Debug, Clone)]
struct Failure {
    remaining: usize,
    error: ImageryError,
}

/// Decode service fake.
///
/// Rasters are registered by band reference; the fake answers requests for
/// the reference's bucket-relative path. Unknown paths fail as an upstream
/// error.
#[derive(Default)]
pub struct FakeDecoder {
    rasters: Mutex<HashMap<String, DecodedRaster>>,
    failures: Mutex<HashMap<String, Failure>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, i32)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a 2x2 raster whose every sample equals `value`.
    pub fn with_intensity(self, reference: &str, value: i64) -> Self {
        self.with_matrix(reference, vec![vec![value; 2]; 2])
    }

    /// Register an explicit raster matrix.
    pub fn with_matrix(self, reference: &str, matrix: Vec<Vec<i64>>) -> Self {
        self.with_raster(reference, DecodedRaster::from_matrix(matrix))
    }

    pub fn with_raster(self, reference: &str, raster: DecodedRaster) -> Self {
        self.rasters
            .lock()
            .unwrap()
            .insert(decode_path(reference), raster);
        self
    }

    /// Fail every request for `reference` with `error`.
    pub fn with_failure(self, reference: &str, error: ImageryError) -> Self {
        self.with_failures(reference, usize::MAX, error)
    }

    /// Fail the first `times` requests for `reference`, then answer normally.
    pub fn with_failures(self, reference: &str, times: usize, error: ImageryError) -> Self {
        self.failures.lock().unwrap().insert(
            decode_path(reference),
            Failure {
                remaining: times,
                error,
            },
        );
        self
    }

    /// Delay answers for `reference`.
    pub fn with_delay(self, reference: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(decode_path(reference), delay);
        self
    }

    /// Delay answers for every path without a specific delay.
    pub fn with_default_delay(self, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(String::new(), delay);
        self
    }

    /// Paths requested so far, in request order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Resolution levels requested so far, in request order.
    pub fn resolution_levels(&self) -> Vec<i32> {
        self.calls.lock().unwrap().iter().map(|(_, l)| *l).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of requests made for one reference.
    pub fn calls_for(&self, reference: &str) -> usize {
        let path = decode_path(reference);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == path)
            .count()
    }

    /// Highest number of requests observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn delay_for(&self, path: &str) -> Option<Duration> {
        let delays = self.delays.lock().unwrap();
        delays.get(path).or_else(|| delays.get("")).copied()
    }

    fn take_failure(&self, path: &str) -> Option<ImageryError> {
        let mut failures = self.failures.lock().unwrap();
        let failure = failures.get_mut(path)?;
        if failure.remaining == 0 {
            return None;
        }
        if failure.remaining != usize::MAX {
            failure.remaining -= 1;
        }
        Some(failure.error.clone())
    }
}

#[async_trait]
impl DecodeClient for FakeDecoder {
    async fn decode(&self, path: &str, resolution_level: i32) -> ImageryResult<DecodedRaster> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), resolution_level));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay_for(path) {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.take_failure(path) {
            return Err(error);
        }

        self.rasters
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ImageryError::upstream("decode", format!("no raster for {}", path)))
    }
}

/// Scene catalog fake returning a fixed scene list.
#[derive(Default)]
pub struct FakeCatalog {
    scenes: Vec<Scene>,
    error: Option<ImageryError>,
    queries: Mutex<Vec<(SceneQuery, usize)>>,
}

impl FakeCatalog {
    /// Catalog answering with `urls`, most recent first.
    pub fn with_scenes<S: AsRef<str>>(urls: &[S]) -> Self {
        Self {
            scenes: urls
                .iter()
                .map(|u| Scene {
                    base_url: u.as_ref().to_string(),
                    sensing_time: None,
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Catalog failing every query.
    pub fn failing(error: ImageryError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Queries received so far, with their limits.
    pub fn queries(&self) -> Vec<(SceneQuery, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn find_scenes(&self, query: &SceneQuery, limit: usize) -> ImageryResult<Vec<Scene>> {
        self.queries.lock().unwrap().push((*query, limit));
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        Ok(self.scenes.iter().take(limit).cloned().collect())
    }
}

/// Object listing fake keyed by bucket and prefix.
///
/// Prefixes with nothing registered list as empty.
#[derive(Default)]
pub struct FakeListing {
    objects: HashMap<(String, String), Vec<String>>,
    failing: HashMap<(String, String), ImageryError>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(mut self, bucket: &str, prefix: &str, names: Vec<String>) -> Self {
        self.objects
            .insert((bucket.to_string(), prefix.to_string()), names);
        self
    }

    pub fn with_failure(mut self, bucket: &str, prefix: &str, error: ImageryError) -> Self {
        self.failing
            .insert((bucket.to_string(), prefix.to_string()), error);
        self
    }

    /// (bucket, prefix) pairs listed so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingClient for FakeListing {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> ImageryResult<Vec<String>> {
        let key = (bucket.to_string(), prefix.to_string());
        self.calls.lock().unwrap().push(key.clone());

        if let Some(error) = self.failing.get(&key) {
            return Err(error.clone());
        }
        Ok(self.objects.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{band_reference, scene_prefix, SENTINEL_BUCKET};
    use imagery_common::Band;

    #[tokio::test]
    async fn test_fake_decoder_answers_registered_paths() {
        let r = band_reference("T1", Band::Red);
        let decoder = FakeDecoder::new().with_intensity(&r, 42);

        let raster = decoder.decode(&decode_path(&r), -1).await.unwrap();
        assert_eq!(raster.representative_intensity(None).unwrap(), 42.0);
        assert_eq!(decoder.calls(), vec![decode_path(&r)]);
        assert_eq!(decoder.resolution_levels(), vec![-1]);
    }

    #[tokio::test]
    async fn test_fake_decoder_transient_failures() {
        let r = band_reference("T1", Band::Blue);
        let decoder = FakeDecoder::new()
            .with_intensity(&r, 7)
            .with_failures(&r, 1, ImageryError::upstream("decode", "boom"));

        assert!(decoder.decode(&decode_path(&r), -1).await.is_err());
        assert!(decoder.decode(&decode_path(&r), -1).await.is_ok());
        assert_eq!(decoder.calls_for(&r), 2);
    }

    #[tokio::test]
    async fn test_fake_decoder_unknown_path() {
        let decoder = FakeDecoder::new();
        let err = decoder.decode("nowhere", -1).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_fake_catalog_honours_limit() {
        let catalog = FakeCatalog::with_scenes(&["gs://b/a", "gs://b/b", "gs://b/c"]);
        let query = SceneQuery::Point(imagery_common::Coordinate::new(1.0, 2.0).unwrap());
        let scenes = catalog.find_scenes(&query, 2).await.unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(catalog.queries(), vec![(query, 2)]);
    }

    #[tokio::test]
    async fn test_fake_listing() {
        let prefix = scene_prefix("T1");
        let listing = FakeListing::new().with_objects(SENTINEL_BUCKET, &prefix, vec!["x".into()]);
        assert_eq!(
            listing.list_objects(SENTINEL_BUCKET, &prefix).await.unwrap(),
            vec!["x".to_string()]
        );
        assert!(listing
            .list_objects(SENTINEL_BUCKET, "other")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(listing.calls().len(), 2);
    }
}
