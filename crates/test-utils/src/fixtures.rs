//! Common test fixtures for imagery tests.
//!
//! Builders for scene URLs, band-file references and listings that follow the
//! public Sentinel-2 bucket layout.

use imagery_common::{Band, TileCandidate};

/// Bucket holding the public Sentinel-2 archive.
pub const SENTINEL_BUCKET: &str = "gcp-public-data-sentinel-2";

/// Bucket-relative `IMG_DATA` prefix for a tile id.
pub fn scene_prefix(tile: &str) -> String {
    format!(
        "tiles/10/S/EG/{tile}.SAFE/GRANULE/L1C_{tile}/IMG_DATA",
        tile = tile
    )
}

/// `gs://` URL of a tile's `IMG_DATA` directory, as the catalog returns it.
pub fn scene_url(tile: &str) -> String {
    format!("gs://{}/{}", SENTINEL_BUCKET, scene_prefix(tile))
}

/// Bucket-relative object name of one band file.
pub fn band_object(tile: &str, band: Band) -> String {
    format!("{}/{}_{}", scene_prefix(tile), tile, band.file_suffix())
}

/// Fully-qualified reference of one band file.
pub fn band_reference(tile: &str, band: Band) -> String {
    format!("gs://{}/{}", SENTINEL_BUCKET, band_object(tile, band))
}

/// Candidate made of the given bands of one tile, in order.
pub fn candidate(tile: &str, bands: &[Band]) -> TileCandidate {
    bands.iter().map(|b| band_reference(tile, *b)).collect()
}

/// Candidate holding all three visible bands (red, green, blue order).
pub fn rgb_candidate(tile: &str) -> TileCandidate {
    candidate(tile, &[Band::Red, Band::Green, Band::Blue])
}

/// Object names a storage listing of the tile would return, including
/// files that are not visible bands.
pub fn listing_for(tile: &str) -> Vec<String> {
    let prefix = scene_prefix(tile);
    vec![
        format!("{}/{}_B01.jp2", prefix, tile),
        band_object(tile, Band::Blue),
        band_object(tile, Band::Green),
        band_object(tile, Band::Red),
        format!("{}/{}_B08.jp2", prefix, tile),
        format!("{}/{}_TCI.jp2", prefix, tile),
    ]
}

/// Path the decode service receives for a reference (bucket stripped).
pub fn decode_path(reference: &str) -> String {
    reference
        .strip_prefix(&format!("gs://{}/", SENTINEL_BUCKET))
        .unwrap_or(reference)
        .to_string()
}
