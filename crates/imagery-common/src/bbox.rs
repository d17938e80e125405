//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::coord::{parse_degrees, Coordinate};
use crate::error::{ImageryError, ImageryResult};

/// A geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Create a new bounding box, requiring `south <= north` and `west <= east`.
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> ImageryResult<Self> {
        // Corner validation also rejects NaN and out-of-range values.
        Coordinate::new(south, west)?;
        Coordinate::new(north, east)?;

        if south > north {
            return Err(ImageryError::InvalidCoordinate(format!(
                "south {} is north of {}",
                south, north
            )));
        }
        if west > east {
            return Err(ImageryError::InvalidCoordinate(format!(
                "west {} is east of {}",
                west, east
            )));
        }

        Ok(Self {
            south,
            north,
            west,
            east,
        })
    }

    /// Parse a bounding box from the raw `south`, `north`, `west`, `east` query strings.
    pub fn parse(south: &str, north: &str, west: &str, east: &str) -> ImageryResult<Self> {
        Self::new(
            parse_degrees("south", south)?,
            parse_degrees("north", north)?,
            parse_degrees("west", west)?,
            parse_degrees("east", east)?,
        )
    }

    /// Check if a coordinate lies within this bbox (edges inclusive).
    pub fn contains(&self, coord: &Coordinate) -> bool {
        coord.lat >= self.south
            && coord.lat <= self.north
            && coord.lng >= self.west
            && coord.lng <= self.east
    }

    /// Check if another bbox lies entirely within this one.
    pub fn contains_bbox(&self, other: &BoundingBox) -> bool {
        self.south <= other.south
            && other.north <= self.north
            && self.west <= other.west
            && other.east <= self.east
    }
}
