//! Object storage listing for scene band files (Google Cloud Storage).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::{gcp::GoogleCloudStorageBuilder, path::Path, ObjectStore};
use reqwest::Url;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use imagery_common::{Band, ImageryError, ImageryResult, TileCandidate};

/// Lists object names under a prefix.
#[async_trait]
pub trait ListingClient: Send + Sync {
    /// List the full names of all objects in `bucket` starting with `prefix`.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> ImageryResult<Vec<String>>;
}

/// Listing client over Google Cloud Storage.
///
/// Credentials come from the environment (`GOOGLE_SERVICE_ACCOUNT`,
/// `GOOGLE_APPLICATION_CREDENTIALS`) or the instance metadata server.
/// One store is built per bucket and reused.
#[derive(Default)]
pub struct GcsListing {
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl GcsListing {
    pub fn new() -> Self {
        Self::default()
    }

    async fn store_for(&self, bucket: &str) -> ImageryResult<Arc<dyn ObjectStore>> {
        if let Some(store) = self.stores.read().await.get(bucket) {
            return Ok(Arc::clone(store));
        }

        let store: Arc<dyn ObjectStore> = Arc::new(
            GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| {
                    ImageryError::upstream("listing", format!("Failed to create GCS client: {}", e))
                })?,
        );

        self.stores
            .write()
            .await
            .insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

#[async_trait]
impl ListingClient for GcsListing {
    #[instrument(skip(self))]
    async fn list_objects(&self, bucket: &str, prefix: &str) -> ImageryResult<Vec<String>> {
        use futures::TryStreamExt;

        let store = self.store_for(bucket).await?;
        let prefix_path = Path::from(prefix);
        let mut names = Vec::new();

        let mut stream = store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| ImageryError::upstream("listing", format!("List failed: {}", e)))?
        {
            names.push(meta.location.to_string());
        }

        debug!(count = names.len(), "Listed objects");
        Ok(names)
    }
}

/// A `gs://bucket/path` location split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePath {
    pub bucket: String,
    pub path: String,
}

impl ScenePath {
    /// Parse a `gs://` URL. The path has its leading `/` removed.
    pub fn parse(url: &str) -> ImageryResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| ImageryError::InvalidFormat(format!("{}: {}", url, e)))?;

        let bucket = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ImageryError::InvalidFormat(format!("{}: missing bucket", url)))?
            .to_string();

        Ok(Self {
            bucket,
            path: parsed.path().trim_start_matches('/').to_string(),
        })
    }

    /// Fully-qualified reference for an object in this path's bucket.
    pub fn reference(&self, object_name: &str) -> String {
        format!("gs://{}/{}", self.bucket, object_name)
    }
}

/// List the blue, green and red band files for one scene.
///
/// Object names keep the listing's order; anything that is not one of the
/// three visible bands is dropped.
pub async fn list_band_files(
    listing: &dyn ListingClient,
    scene_url: &str,
) -> ImageryResult<TileCandidate> {
    let scene = ScenePath::parse(scene_url)?;
    info!(bucket = %scene.bucket, prefix = %scene.path, "Listing band files");

    let names = listing.list_objects(&scene.bucket, &scene.path).await?;

    Ok(names
        .iter()
        .filter(|name| Band::for_reference(name).is_some())
        .map(|name| scene.reference(name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticListing(Vec<&'static str>);

    #[async_trait]
    impl ListingClient for StaticListing {
        async fn list_objects(&self, bucket: &str, prefix: &str) -> ImageryResult<Vec<String>> {
            assert_eq!(bucket, "gcp-public-data-sentinel-2");
            assert_eq!(prefix, "tiles/10/S/EG/S2A.SAFE/GRANULE/L1C_T10SEG/IMG_DATA");
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    #[test]
    fn test_parse_scene_path() {
        let p = ScenePath::parse("gs://gcp-public-data-sentinel-2/tiles/10/S/EG/IMG_DATA").unwrap();
        assert_eq!(p.bucket, "gcp-public-data-sentinel-2");
        assert_eq!(p.path, "tiles/10/S/EG/IMG_DATA");
        assert_eq!(
            p.reference("tiles/x_B02.jp2"),
            "gs://gcp-public-data-sentinel-2/tiles/x_B02.jp2"
        );
    }

    #[test]
    fn test_parse_scene_path_rejects_garbage() {
        assert!(ScenePath::parse("not a url").is_err());
    }

    #[tokio::test]
    async fn test_list_band_files_filters_and_qualifies() {
        let prefix = "tiles/10/S/EG/S2A.SAFE/GRANULE/L1C_T10SEG/IMG_DATA";
        let listing = StaticListing(vec![
            "tiles/10/S/EG/S2A.SAFE/GRANULE/L1C_T10SEG/IMG_DATA/T10SEG_B01.jp2",
            "tiles/10/S/EG/S2A.SAFE/GRANULE/L1C_T10SEG/IMG_DATA/T10SEG_B04.jp2",
            "tiles/10/S/EG/S2A.SAFE/GRANULE/L1C_T10SEG/IMG_DATA/T10SEG_B02.jp2",
            "tiles/10/S/EG/S2A.SAFE/GRANULE/L1C_T10SEG/IMG_DATA/T10SEG_TCI.jp2",
            "tiles/10/S/EG/S2A.SAFE/GRANULE/L1C_T10SEG/IMG_DATA/T10SEG_B03.jp2",
        ]);

        let url = format!("gs://gcp-public-data-sentinel-2/{}", prefix);
        let files = list_band_files(&listing, &url).await.unwrap();
        assert_eq!(
            files,
            vec![
                format!("gs://gcp-public-data-sentinel-2/{}/T10SEG_B04.jp2", prefix),
                format!("gs://gcp-public-data-sentinel-2/{}/T10SEG_B02.jp2", prefix),
                format!("gs://gcp-public-data-sentinel-2/{}/T10SEG_B03.jp2", prefix),
            ]
        );
    }
}
