//! Spectral bands used for ranking.
//!
//! Sentinel-2 stores each band as a separate JPEG2000 file whose name ends in
//! the band code, e.g. `T10SEG_20240101T000000_B03.jp2`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::ImageryError;

/// One of the visible-light bands the service can rank on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Blue,
    Green,
    Red,
}

impl Band {
    /// Every band, in axis order.
    pub const ALL: [Band; 3] = [Band::Blue, Band::Green, Band::Red];

    /// Sentinel-2 band code.
    pub fn code(&self) -> &'static str {
        match self {
            Band::Blue => "B02",
            Band::Green => "B03",
            Band::Red => "B04",
        }
    }

    /// Substring identifying this band's file in a reference.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Band::Blue => "B02.jp2",
            Band::Green => "B03.jp2",
            Band::Red => "B04.jp2",
        }
    }

    /// Pure-channel color this band stands for.
    pub fn canonical_color(&self) -> Color {
        match self {
            Band::Blue => Color::new(0, 0, 255),
            Band::Green => Color::new(0, 255, 0),
            Band::Red => Color::new(255, 0, 0),
        }
    }

    /// Position of this band's axis in a [`crate::BandVector`].
    pub fn index(&self) -> usize {
        match self {
            Band::Blue => 0,
            Band::Green => 1,
            Band::Red => 2,
        }
    }

    /// Whether a band-file reference belongs to this band.
    pub fn matches(&self, reference: &str) -> bool {
        reference.contains(self.file_suffix())
    }

    /// Find the band a reference belongs to, if any.
    pub fn for_reference(reference: &str) -> Option<Band> {
        Band::ALL.into_iter().find(|band| band.matches(reference))
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Band {
    type Err = ImageryError;

    /// Accepts band codes (`B02`) and channel names (`green`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "B02" | "BLUE" => Ok(Band::Blue),
            "B03" | "GREEN" => Ok(Band::Green),
            "B04" | "RED" => Ok(Band::Red),
            _ => Err(ImageryError::UnsupportedBand(s.to_string())),
        }
    }
}
