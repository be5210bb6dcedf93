//! Candidate rotations from principal axes.
//!
//! Two point sets with the same shape share principal axes up to the sign of
//! each axis. Enumerating the sign patterns gives a small set of starting
//! rotations for the local refinement loop.

use nalgebra::{Matrix3, SVD};

use crate::error::{Error, Result};
use crate::shape::{center, ensure_3d};
use crate::types::{PointSet, Rotation};

/// Sign patterns with determinant +1.
const PROPER_SIGNS: [[f64; 3]; 4] = [
    [1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
];

/// Sign patterns with determinant −1 (mirror images).
const MIRROR_SIGNS: [[f64; 3]; 4] = [
    [-1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
];

/// Principal directions of `points` as the columns of a proper rotation,
/// ordered by decreasing spread.
pub fn principal_axes(points: &PointSet) -> Result<Matrix3<f64>> {
    ensure_3d("principal axes", points)?;
    let centred = center(points);
    let scatter = centred.transpose() * &centred;
    let scatter = Matrix3::from_column_slice(scatter.as_slice());
    if scatter.iter().any(|x| !x.is_finite()) {
        return Err(Error::Degenerate(
            "principal axes: scatter matrix is not finite".to_string(),
        ));
    }

    let svd = SVD::new(scatter, true, false);
    let u = svd
        .u
        .ok_or_else(|| Error::Degenerate("principal axes: SVD did not return U".to_string()))?;

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));

    let mut axes = Matrix3::zeros();
    for (dst, &src) in order.iter().enumerate() {
        axes.set_column(dst, &u.column(src));
    }
    if axes.determinant() < 0.0 {
        axes.column_mut(2).neg_mut();
    }
    Ok(axes)
}

/// Candidate rotations carrying `moving` onto `reference`.
///
/// Each candidate is `U_moving · diag(s) · U_referenceᵀ` in the row-vector
/// convention, so `moving * R` lines the principal axes of `moving` up with
/// those of `reference`. The four proper candidates come first; with
/// `mirror` the four reflective ones follow.
pub fn principal_component_seeds(
    reference: &PointSet,
    moving: &PointSet,
    mirror: bool,
) -> Result<Vec<Rotation>> {
    let ux = principal_axes(reference)?;
    let uy = principal_axes(moving)?;

    let patterns = PROPER_SIGNS
        .iter()
        .chain(MIRROR_SIGNS.iter().take(if mirror { 4 } else { 0 }));

    Ok(patterns
        .map(|s| {
            let signs = Matrix3::from_diagonal(&nalgebra::Vector3::new(s[0], s[1], s[2]));
            uy * signs * ux.transpose()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::rotate;
    use nalgebra::Rotation3;

    fn cloud() -> PointSet {
        PointSet::from_row_slice(
            6,
            3,
            &[
                0.0, 0.0, 0.0, //
                4.0, 0.2, 0.1, //
                0.5, 2.0, -0.3, //
                1.0, 0.3, 1.0, //
                2.5, 1.1, 0.4, //
                3.1, -0.6, 0.2,
            ],
        )
    }

    #[test]
    fn axes_form_a_proper_rotation() {
        let axes = principal_axes(&cloud()).unwrap();
        assert!((axes.determinant() - 1.0).abs() < 1e-9);
        assert!((axes.transpose() * axes - Matrix3::identity()).norm() < 1e-9);
    }

    #[test]
    fn proper_seeds_only_without_mirror() {
        let x = cloud();
        let seeds = principal_component_seeds(&x, &x, false).unwrap();
        assert_eq!(seeds.len(), 4);
        for r in &seeds {
            assert!((r.determinant() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn mirror_adds_four_improper_seeds() {
        let x = cloud();
        let seeds = principal_component_seeds(&x, &x, true).unwrap();
        assert_eq!(seeds.len(), 8);
        let improper = seeds.iter().filter(|r| r.determinant() < 0.0).count();
        assert_eq!(improper, 4);
    }

    #[test]
    fn one_seed_matches_the_true_rotation() {
        let x = cloud();
        let truth = *Rotation3::from_euler_angles(0.4, -0.9, 2.0).matrix();
        let y = rotate(&x, &truth);

        let seeds = principal_component_seeds(&x, &y, false).unwrap();
        let inverse = truth.transpose();
        let best = seeds
            .iter()
            .map(|r| (r - inverse).norm())
            .fold(f64::INFINITY, f64::min);
        assert!(best < 1e-6, "closest seed is {best} away");
    }
}
