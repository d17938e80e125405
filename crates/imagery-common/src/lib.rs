//! Common types and utilities shared across the imagery services.

pub mod band;
pub mod bbox;
pub mod color;
pub mod coord;
pub mod error;

pub use band::Band;
pub use bbox::BoundingBox;
pub use color::{distance, luminosity, BandVector, Color, LUMINOSITY_SCALE};
pub use coord::Coordinate;
pub use error::{ImageryError, ImageryResult};

/// An ordered list of band-file references belonging to one scene.
///
/// Order follows the storage listing and carries no meaning of its own.
pub type TileCandidate = Vec<String>;
