//! Request pipeline: locate scenes, list their band files, optionally rank.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use metrics::histogram;
use tracing::{info, instrument};

use imagery_common::{Band, BoundingBox, Color, Coordinate, ImageryError, ImageryResult, TileCandidate};
use ranking::{RankTarget, RankingEngine};
use storage::{list_band_files, CatalogClient, ListingClient, SceneQuery};

use crate::geocode::GeocodeClient;

/// Optional ranking applied to a result list.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankingOptions {
    pub by_band: Option<Band>,
    pub by_value: Option<Color>,
}

impl RankingOptions {
    /// Parse the raw `rankByBand` and `rankByValue` parameters.
    ///
    /// Absent or empty parameters disable that ranking; anything else must be
    /// valid, so both are checked before any upstream work starts.
    pub fn parse(rank_by_band: Option<&str>, rank_by_value: Option<&str>) -> ImageryResult<Self> {
        let by_band = non_empty(rank_by_band).map(Band::from_str).transpose()?;
        let by_value = non_empty(rank_by_value).map(Color::from_hex).transpose()?;
        Ok(Self { by_band, by_value })
    }

    pub fn is_empty(&self) -> bool {
        self.by_band.is_none() && self.by_value.is_none()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Sequences the external collaborators for one request.
pub struct Pipeline {
    catalog: Arc<dyn CatalogClient>,
    listing: Arc<dyn ListingClient>,
    geocoder: Arc<dyn GeocodeClient>,
    engine: RankingEngine,
    scene_limit: usize,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        listing: Arc<dyn ListingClient>,
        geocoder: Arc<dyn GeocodeClient>,
        engine: RankingEngine,
        scene_limit: usize,
    ) -> Self {
        Self {
            catalog,
            listing,
            geocoder,
            engine,
            scene_limit,
        }
    }

    /// Band files of the most recent scenes covering `coord`.
    pub async fn images_at_point(
        &self,
        coord: Coordinate,
        options: &RankingOptions,
    ) -> ImageryResult<Vec<TileCandidate>> {
        self.run(SceneQuery::Point(coord), options).await
    }

    /// Band files of the most recent scenes lying inside `bbox`.
    pub async fn images_in_area(
        &self,
        bbox: BoundingBox,
        options: &RankingOptions,
    ) -> ImageryResult<Vec<TileCandidate>> {
        self.run(SceneQuery::Area(bbox), options).await
    }

    /// Geocode `address`, then behave like [`Pipeline::images_at_point`].
    pub async fn images_for_address(
        &self,
        address: &str,
        options: &RankingOptions,
    ) -> ImageryResult<Vec<TileCandidate>> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ImageryError::MissingParameter("address".to_string()));
        }

        let coord = self.geocoder.resolve_address(address).await?;
        info!(lat = coord.lat, lng = coord.lng, "Resolved address");

        self.images_at_point(coord, options).await
    }

    /// Un-clamped mean intensity of one band file.
    pub async fn band_average(&self, reference: &str) -> ImageryResult<f64> {
        if reference.trim().is_empty() {
            return Err(ImageryError::MissingParameter("path".to_string()));
        }
        self.engine.average(reference.trim()).await
    }

    #[instrument(skip(self, options))]
    async fn run(
        &self,
        query: SceneQuery,
        options: &RankingOptions,
    ) -> ImageryResult<Vec<TileCandidate>> {
        let scenes = self.catalog.find_scenes(&query, self.scene_limit).await?;
        info!(count = scenes.len(), "Found scenes");

        let listing = self.listing.as_ref();
        let candidates = try_join_all(
            scenes
                .iter()
                .map(|scene| list_band_files(listing, &scene.base_url)),
        )
        .await?;

        histogram!("imagery_scenes_returned").record(candidates.len() as f64);

        Ok(self.rank(candidates, options).await)
    }

    /// Apply band ranking, then color ranking. The second sort is stable, so
    /// band order breaks its ties.
    async fn rank(&self, candidates: Vec<TileCandidate>, options: &RankingOptions) -> Vec<TileCandidate> {
        if options.is_empty() || candidates.is_empty() {
            return candidates;
        }

        let start = Instant::now();
        let mut ranked = candidates;

        if let Some(band) = options.by_band {
            ranked = self.engine.rank(ranked, &RankTarget::Band(band)).await;
        }
        if let Some(color) = options.by_value {
            ranked = self.engine.rank(ranked, &RankTarget::Color(color)).await;
        }

        histogram!("imagery_rank_duration_seconds").record(start.elapsed().as_secs_f64());
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_absent() {
        let opts = RankingOptions::parse(None, None).unwrap();
        assert!(opts.is_empty());

        let opts = RankingOptions::parse(Some(""), Some(" ")).unwrap();
        assert!(opts.is_empty());
    }

    #[test]
    fn test_options_both() {
        let opts = RankingOptions::parse(Some("B04"), Some("00FF00")).unwrap();
        assert_eq!(opts.by_band, Some(Band::Red));
        assert_eq!(opts.by_value, Some(Color::new(0, 255, 0)));
    }

    #[test]
    fn test_options_invalid_value() {
        let err = RankingOptions::parse(None, Some("12345")).unwrap_err();
        assert!(matches!(err, ImageryError::InvalidFormat(_)));
    }

    #[test]
    fn test_options_invalid_band() {
        let err = RankingOptions::parse(Some("B99"), Some("ff0000")).unwrap_err();
        assert!(matches!(err, ImageryError::UnsupportedBand(_)));
    }
}
