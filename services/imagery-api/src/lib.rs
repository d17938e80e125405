//! Imagery API Service Library
//!
//! HTTP service that finds Sentinel-2 scenes covering a location, lists
//! their visible-band files and optionally ranks them by color proximity.

pub mod config;
pub mod geocode;
pub mod handlers;
pub mod pipeline;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::common::method_not_allowed;
use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Search
        .route(
            "/images",
            get(handlers::images::images_handler).fallback(method_not_allowed),
        )
        .route(
            "/imagesFromAddress",
            get(handlers::images::images_from_address_handler).fallback(method_not_allowed),
        )
        .route(
            "/imagesInArea",
            get(handlers::images::images_in_area_handler).fallback(method_not_allowed),
        )
        .route(
            "/bandAverage",
            get(handlers::images::band_average_handler).fallback(method_not_allowed),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
