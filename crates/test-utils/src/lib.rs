//! Shared test utilities for the imagery workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Fakes for the decode service, scene catalog and object listing
//! - Fixture builders for Sentinel-2 band references
//! - `assert_close!` for comparing intensities
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, FakeDecoder};
//! ```

pub mod fakes;
pub mod fixtures;

// Re-export commonly used items at the crate root
pub use fakes::{FakeCatalog, FakeDecoder, FakeListing};
pub use fixtures::*;

/// Assert two intensities agree to within a tolerance.
///
/// The tolerance scales with the larger magnitude, so raw band averages in
/// the tens of thousands and luminosity fractions compare the same way. The
/// two-argument form uses a tolerance of `1e-9`.
#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr) => {
        $crate::assert_close!($left, $right, 1e-9)
    };
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let (left, right, tolerance): (f64, f64, f64) = ($left, $right, $tolerance);
        let allowed = tolerance * left.abs().max(right.abs()).max(1.0);
        assert!(
            (left - right).abs() <= allowed,
            "{} is not within {} of {}",
            left,
            allowed,
            right
        );
    }};
}
