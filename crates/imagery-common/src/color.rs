//! Color model used for ranking tiles by visual similarity.
//!
//! Distances are not measured in raw RGB. Each target channel is converted to
//! a perceptual luminosity contribution scaled by `10000 / 256`, which maps an
//! 8-bit channel onto the 0..10000 reflectance range that band averages use.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::band::Band;
use crate::error::{ImageryError, ImageryResult};

/// Scale applied to the weighted channel sum.
pub const LUMINOSITY_SCALE: f64 = 10000.0 / 256.0;

const RED_WEIGHT: f64 = 0.21;
const GREEN_WEIGHT: f64 = 0.72;
const BLUE_WEIGHT: f64 = 0.07;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a 6-digit hexadecimal color such as `ff8800`.
    pub fn from_hex(hex: &str) -> ImageryResult<Self> {
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ImageryError::InvalidFormat(format!(
                "expected 6 hex digits, got {:?}",
                hex
            )));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| ImageryError::InvalidFormat(format!("{}: {}", hex, e)))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Channel value that corresponds to a band.
    pub fn channel(&self, band: Band) -> u8 {
        match band {
            Band::Blue => self.b,
            Band::Green => self.g,
            Band::Red => self.r,
        }
    }

    /// Keep only the channel for `band`, zeroing the others.
    pub fn isolate(&self, band: Band) -> Color {
        let value = self.channel(band);
        match band {
            Band::Blue => Color::new(0, 0, value),
            Band::Green => Color::new(0, value, 0),
            Band::Red => Color::new(value, 0, 0),
        }
    }
}

impl FromStr for Color {
    type Err = ImageryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Perceptual luminosity of a color: `0.21 R + 0.72 G + 0.07 B`, scaled by
/// [`LUMINOSITY_SCALE`].
pub fn luminosity(color: Color) -> f64 {
    let weighted = RED_WEIGHT * f64::from(color.r)
        + GREEN_WEIGHT * f64::from(color.g)
        + BLUE_WEIGHT * f64::from(color.b);
    LUMINOSITY_SCALE * weighted
}

/// A point in band space, one axis per [`Band`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BandVector([f64; 3]);

impl BandVector {
    pub const ZERO: BandVector = BandVector([0.0; 3]);

    pub fn new(blue: f64, green: f64, red: f64) -> Self {
        let mut v = Self::ZERO;
        v[Band::Blue] = blue;
        v[Band::Green] = green;
        v[Band::Red] = red;
        v
    }

    /// Target vector for a color: every axis holds the luminosity of that
    /// axis's channel on its own.
    pub fn target(color: Color) -> Self {
        let mut v = Self::ZERO;
        for band in Band::ALL {
            v[band] = luminosity(color.isolate(band));
        }
        v
    }
}

impl Index<Band> for BandVector {
    type Output = f64;

    fn index(&self, band: Band) -> &f64 {
        &self.0[band.index()]
    }
}

impl IndexMut<Band> for BandVector {
    fn index_mut(&mut self, band: Band) -> &mut f64 {
        &mut self.0[band.index()]
    }
}

/// Euclidean distance between two band vectors.
pub fn distance(a: &BandVector, b: &BandVector) -> f64 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(x, y)| (y - x) * (y - x))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_close;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::from_hex("ff8000").unwrap(), Color::new(255, 128, 0));
        assert_eq!(Color::from_hex("00FF0a").unwrap(), Color::new(0, 255, 10));
    }

    #[test]
    fn test_parse_hex_rejects_bad_input() {
        for bad in ["12345", "1234567", "", "gg0000", "+f0000", "#ff000"] {
            assert!(
                matches!(Color::from_hex(bad), Err(ImageryError::InvalidFormat(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_display_roundtrip() {
        let c = Color::new(1, 171, 255);
        assert_eq!(c.to_string(), "01abff");
        assert_eq!(c.to_string().parse::<Color>().unwrap(), c);
    }

    #[test]
    fn test_luminosity_pure_channels() {
        let scale = 10000.0 / 256.0;
        assert_close!(luminosity(Color::new(255, 0, 0)), 0.21 * 255.0 * scale);
        assert_close!(luminosity(Color::new(0, 255, 0)), 0.72 * 255.0 * scale);
        assert_close!(luminosity(Color::new(0, 0, 255)), 0.07 * 255.0 * scale);
        assert_eq!(luminosity(Color::new(0, 0, 0)), 0.0);
    }

    #[test]
    fn test_target_vector_isolates_channels() {
        let t = BandVector::target(Color::new(255, 0, 0));
        assert!(t[Band::Red] > 0.0);
        assert_eq!(t[Band::Green], 0.0);
        assert_eq!(t[Band::Blue], 0.0);
    }

    #[test]
    fn test_distance() {
        let a = BandVector::new(0.0, 3.0, 0.0);
        let b = BandVector::new(0.0, 0.0, 4.0);
        assert_close!(distance(&a, &b), 5.0);
        assert_eq!(distance(&a, &a), 0.0);
    }
}
