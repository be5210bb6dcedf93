//! Centring, sizing and rotating point sets.

use nalgebra::{DMatrix, RowDVector};

use crate::error::{Error, Result};
use crate::types::{PointSet, Rotation};

/// Below this centroid size a configuration is treated as a single point.
pub const MIN_CENTROID_SIZE: f64 = 1e-12;

/// Mean of the rows.
pub fn centroid(points: &PointSet) -> RowDVector<f64> {
    points.row_mean()
}

/// Copy of `points` with its centroid moved to the origin.
pub fn center(points: &PointSet) -> PointSet {
    let c = centroid(points);
    let mut out = points.clone();
    for mut row in out.row_iter_mut() {
        row -= &c;
    }
    out
}

/// Frobenius norm of the centred configuration.
pub fn centroid_size(points: &PointSet) -> f64 {
    center(points).norm()
}

/// Centre and scale to unit centroid size.
///
/// Returns the normalised set together with the input centroid size.
pub fn normalize(points: &PointSet) -> Result<(PointSet, f64)> {
    let centred = center(points);
    let size = centred.norm();
    if !size.is_finite() || size < MIN_CENTROID_SIZE {
        return Err(Error::Degenerate(format!(
            "configuration has centroid size {size:e}"
        )));
    }
    Ok((centred / size, size))
}

/// `points * rotation` for a 3D point set.
pub fn rotate(points: &PointSet, rotation: &Rotation) -> PointSet {
    points * DMatrix::from_column_slice(3, 3, rotation.as_slice())
}

/// Squared distance between every moving row and every reference row.
///
/// Entry `(k, i)` is `|moving[k] - reference[i]|²`.
pub fn squared_distances(moving: &PointSet, reference: &PointSet) -> DMatrix<f64> {
    DMatrix::from_fn(moving.nrows(), reference.nrows(), |k, i| {
        (moving.row(k) - reference.row(i)).norm_squared()
    })
}

/// Fail unless both sets have the same number of rows and columns.
pub fn ensure_same_shape(context: &'static str, a: &PointSet, b: &PointSet) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::mismatch(
            context,
            format!("{}x{}", a.nrows(), a.ncols()),
            format!("{}x{}", b.nrows(), b.ncols()),
        ));
    }
    Ok(())
}

/// Fail unless `points` is a non-empty N×3 set.
pub fn ensure_3d(context: &'static str, points: &PointSet) -> Result<()> {
    if points.ncols() != 3 {
        return Err(Error::mismatch(
            context,
            "3 columns",
            format!("{} columns", points.ncols()),
        ));
    }
    if points.nrows() == 0 {
        return Err(Error::InvalidInput(format!("{context}: empty point set")));
    }
    Ok(())
}
