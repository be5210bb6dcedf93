//! Core shared types.
//!
//! Point sets are plain `nalgebra` dynamic matrices with one point per row.
//! The correspondence engine works on 3D sets; generalized Procrustes
//! analysis also accepts planar (N×2) configurations.

use nalgebra::{DMatrix, Matrix3};

/// Ordered set of points, one point per row (N×D).
///
/// Row order is meaningful: it is the basis against which permutations are
/// expressed, so it is never reordered in place.
pub type PointSet = DMatrix<f64>;

/// 3×3 rotation acting on row vectors (`points * rotation`).
///
/// May be improper (determinant −1) when mirrored candidates are allowed.
pub type Rotation = Matrix3<f64>;

/// Dense pairwise cost matrix, rows indexed by the moving set and columns by
/// the reference set.
pub type CostMatrix = DMatrix<f64>;

/// D×D orthogonal matrix used by generalized Procrustes analysis, where the
/// dimension is only known at run time.
pub type RotationMatrix = DMatrix<f64>;
