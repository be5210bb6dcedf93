//! Residual measures and gating for the refinement loop.
//!
//! After each rotation update the matched residuals decide how far a moving
//! point may look for a new partner: the gating radius `gamma` is a multiple
//! of the largest matched residual, and only pairs within `gamma` enter the
//! next assignment.

use nalgebra::DMatrix;

use crate::assignment::{Candidates, SparsePattern};
use crate::error::{Error, Result};
use crate::models::Permutation;

/// Largest per-point Euclidean residual, `max_k |moving[k] - matched[k]|`.
///
/// `sq_dist` holds squared distances with entry `(k, i)` for moving row `k`
/// and reference row `i`.
pub fn l2_infinity(sq_dist: &DMatrix<f64>, permutation: &Permutation) -> f64 {
    permutation
        .as_slice()
        .iter()
        .enumerate()
        .map(|(k, &i)| {
            let d = sq_dist[(k, i)];
            if d < 0.0 { 0.0 } else { d.sqrt() }
        })
        // NaN must survive the reduction so the caller can flag it.
        .fold(0.0, |acc, r| if r.is_nan() || r > acc { r } else { acc })
}

/// Sum of squared distances over the matched pairs.
pub fn matched_cost(sq_dist: &DMatrix<f64>, permutation: &Permutation) -> f64 {
    permutation
        .as_slice()
        .iter()
        .enumerate()
        .map(|(k, &i)| sq_dist[(k, i)])
        .sum()
}

/// `gating_factor * l2_infinity`, rejected when not finite.
pub fn gating_radius(
    sq_dist: &DMatrix<f64>,
    permutation: &Permutation,
    gating_factor: f64,
) -> Result<f64> {
    let gamma = gating_factor * l2_infinity(sq_dist, permutation);
    if !gamma.is_finite() {
        return Err(Error::Degenerate(format!(
            "gating radius is not finite ({gamma})"
        )));
    }
    Ok(gamma)
}

/// Pairs whose squared distance does not exceed `gamma²`.
///
/// A pattern that admits every pair collapses to [`Candidates::All`].
pub fn candidates_within(sq_dist: &DMatrix<f64>, gamma: f64) -> Candidates {
    let limit = gamma * gamma;
    let pattern = SparsePattern::from_predicate(sq_dist.nrows(), |k, i| sq_dist[(k, i)] <= limit);
    if pattern.is_dense() {
        Candidates::All
    } else {
        Candidates::Sparse(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[1.0, 4.0, 9.0, 16.0, 0.25, 1.0, 9.0, 4.0, 0.0])
    }

    #[test]
    fn residual_maximum_follows_the_permutation() {
        let id = Permutation::identity(3);
        assert!((l2_infinity(&sq(), &id) - 1.0).abs() < 1e-12);
        let swapped = Permutation::from_vec(vec![1, 0, 2]).unwrap();
        assert!((l2_infinity(&sq(), &swapped) - 4.0).abs() < 1e-12);
        assert!((matched_cost(&sq(), &id) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn gating_keeps_the_current_matching() {
        let id = Permutation::identity(3);
        let gamma = gating_radius(&sq(), &id, 1.5).unwrap();
        assert!((gamma - 1.5).abs() < 1e-12);
        match candidates_within(&sq(), gamma) {
            Candidates::Sparse(p) => {
                for k in 0..3 {
                    assert!(p.contains(k, k));
                }
                assert!(!p.contains(0, 2));
                assert_eq!(p.nnz(), 4);
            }
            other => panic!("expected a sparse pattern, got {other:?}"),
        }
    }

    #[test]
    fn wide_radius_is_unrestricted() {
        assert_eq!(candidates_within(&sq(), 10.0), Candidates::All);
    }

    #[test]
    fn non_finite_radius_is_degenerate() {
        let mut d = sq();
        d[(0, 0)] = f64::NAN;
        let err = gating_radius(&d, &Permutation::identity(3), 1.5).unwrap_err();
        assert!(matches!(err, Error::Degenerate(_)));
    }
}
