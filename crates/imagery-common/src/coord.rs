//! Geographic coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{ImageryError, ImageryResult};

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside the WGS84 ranges.
    pub fn new(lat: f64, lng: f64) -> ImageryResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ImageryError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                lat
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(ImageryError::InvalidCoordinate(format!(
                "longitude {} outside [-180, 180]",
                lng
            )));
        }
        Ok(Self { lat, lng })
    }

    /// Parse a coordinate from the raw `lat` and `lng` query strings.
    pub fn parse(lat: &str, lng: &str) -> ImageryResult<Self> {
        let lat = parse_degrees("lat", lat)?;
        let lng = parse_degrees("lng", lng)?;
        Self::new(lat, lng)
    }
}

/// Parse a single degree value, naming the parameter in the error.
pub(crate) fn parse_degrees(name: &str, value: &str) -> ImageryResult<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ImageryError::MissingParameter(name.to_string()));
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| ImageryError::InvalidFormat(format!("{} is not a number: {}", name, value)))
}
