//! Application state for the imagery API.

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use ranking::{HttpDecodeClient, IntensityResolver, RankingEngine};
use storage::{BigQueryCatalog, GcsListing, TokenSource};

use crate::config::ServiceConfig;
use crate::geocode::GoogleGeocoder;
use crate::pipeline::Pipeline;

/// Shared application state.
pub struct AppState {
    /// Request pipeline over the external collaborators.
    pub pipeline: Pipeline,

    /// Prometheus recorder handle, when one is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the production collaborators from configuration.
    pub fn new(config: &ServiceConfig, metrics: Option<PrometheusHandle>) -> Result<Self> {
        let tokens = TokenSource::from_config(config.access_token.clone());

        let catalog = BigQueryCatalog::new(config.catalog_config(), tokens)
            .context("Failed to create catalog client")?;
        let geocoder = GoogleGeocoder::new(
            &config.geocode_url,
            &config.geocode_api_key,
            config.request_timeout(),
        )
        .context("Failed to create geocoding client")?;
        let decoder = HttpDecodeClient::new(&config.decode_config())
            .context("Failed to create decode client")?;

        let resolver = IntensityResolver::new(
            Arc::new(decoder),
            config.max_concurrent_decodes,
            config.retry_policy(),
            config.decode_resolution_level,
        );
        let engine = RankingEngine::new(Arc::new(resolver), Some(config.quantification_value));

        let pipeline = Pipeline::new(
            Arc::new(catalog),
            Arc::new(GcsListing::new()),
            Arc::new(geocoder),
            engine,
            config.scene_limit,
        );

        info!(
            project = %config.project_id,
            table = %config.catalog_table,
            scene_limit = config.scene_limit,
            max_concurrent_decodes = config.max_concurrent_decodes,
            "Initialized pipeline"
        );

        Ok(Self { pipeline, metrics })
    }

    /// State around an already-built pipeline.
    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            metrics: None,
        }
    }
}
