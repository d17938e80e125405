//! Band intensity resolution and color-proximity ranking.
//!
//! A tile candidate is a list of band-file references for one scene. Ranking
//! decodes the relevant band files through a [`DecodeClient`], reduces each to
//! a single representative intensity, and orders candidates by their distance
//! to a target color in band space.

pub mod decode;
pub mod engine;
pub mod intensity;
pub mod resolver;

pub use decode::{DecodeClient, DecodeConfig, DecodedRaster, HttpDecodeClient};
pub use engine::{order_by_distance, RankTarget, RankingEngine};
pub use intensity::{representative_intensity, RasterShape};
pub use resolver::{IntensityResolver, RetryPolicy};
