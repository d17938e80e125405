//! Reduction of a decoded band raster to one representative intensity.

use serde::{Deserialize, Serialize};
use tracing::debug;

use imagery_common::{ImageryError, ImageryResult};

/// Declared dimensions of a decoded raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterShape {
    pub rows: usize,
    pub cols: usize,
}

impl RasterShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Build a shape from the decode service's `[rows, cols]` array.
    pub fn from_dims(dims: &[usize]) -> ImageryResult<Self> {
        match dims {
            [rows, cols] => Ok(Self::new(*rows, *cols)),
            other => Err(ImageryError::ShapeMismatch(format!(
                "expected [rows, cols], got {:?}",
                other
            ))),
        }
    }

    /// Number of samples, or `None` when `rows * cols` does not fit a `usize`.
    pub fn sample_count(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }
}

/// Mean sample value of a raster, optionally clamping samples above `cap`.
///
/// The clamp is used when ranking by color so that saturated pixels (values
/// above the quantification value) cannot pull the mean away from the visible
/// range. Plain band averages pass `None`.
///
/// Fails with `ShapeMismatch` when the declared shape is empty, overflows, or
/// disagrees with the matrix. Samples are summed in `i128`, so any matrix
/// that fits in memory cannot overflow the total.
pub fn representative_intensity(
    matrix: &[Vec<i64>],
    shape: RasterShape,
    cap: Option<i64>,
) -> ImageryResult<f64> {
    let count = match shape.sample_count() {
        Some(0) => {
            return Err(ImageryError::ShapeMismatch(format!(
                "empty shape {}x{}",
                shape.rows, shape.cols
            )))
        }
        Some(count) => count,
        None => {
            return Err(ImageryError::ShapeMismatch(format!(
                "shape {}x{} overflows the sample count",
                shape.rows, shape.cols
            )))
        }
    };

    if matrix.len() != shape.rows {
        return Err(ImageryError::ShapeMismatch(format!(
            "declared {} rows, matrix has {}",
            shape.rows,
            matrix.len()
        )));
    }

    let mut total: i128 = 0;
    let mut clamped: usize = 0;

    for (i, row) in matrix.iter().enumerate() {
        if row.len() != shape.cols {
            return Err(ImageryError::ShapeMismatch(format!(
                "row {} has {} columns, declared {}",
                i,
                row.len(),
                shape.cols
            )));
        }

        for &sample in row {
            match cap {
                Some(cap) if sample > cap => {
                    clamped += 1;
                    total += i128::from(cap);
                }
                _ => total += i128::from(sample),
            }
        }
    }

    if clamped > 0 {
        debug!(clamped, cap = ?cap, "Capped samples above the quantification value");
    }

    Ok(total as f64 / count as f64)
}
