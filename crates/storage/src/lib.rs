//! Storage abstractions for the imagery services.
//!
//! Provides narrow interfaces for:
//! - The geospatial scene catalog (BigQuery Sentinel-2 index)
//! - Object storage listing (Google Cloud Storage) for band files

pub mod auth;
pub mod catalog;
pub mod object_store;

pub use self::object_store::{list_band_files, GcsListing, ListingClient, ScenePath};
pub use auth::TokenSource;
pub use catalog::{BigQueryCatalog, CatalogClient, CatalogConfig, Scene, SceneQuery};
