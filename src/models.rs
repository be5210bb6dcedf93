//! Result types produced by the correspondence engine.
//!
//! These are small value types: a vertex permutation, the outcome of one
//! pairwise alignment, and the per-shape alignment into a common frame.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::shape::rotate;
use crate::types::{PointSet, Rotation};

/// Vertex correspondence between a moving set and a reference set.
///
/// `map[k]` is the reference row matched to moving row `k`. As a matrix,
/// entry `(k, map[k])` is one and every other entry is zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Permutation {
    map: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            map: (0..n).collect(),
        }
    }

    /// Build from an index vector, rejecting anything that is not a bijection.
    pub fn from_vec(map: Vec<usize>) -> Result<Self> {
        let n = map.len();
        let mut seen = vec![false; n];
        for &target in &map {
            if target >= n || seen[target] {
                return Err(Error::InvalidInput(format!(
                    "{map:?} is not a permutation of 0..{n}"
                )));
            }
            seen[target] = true;
        }
        Ok(Self { map })
    }

    pub(crate) fn from_vec_unchecked(map: Vec<usize>) -> Self {
        Self { map }
    }

    /// Read a 0/1 matrix back into a permutation.
    ///
    /// Entries above `threshold` count as ones. Fails with
    /// [`Error::InvalidPermutation`] unless every row and every column holds
    /// exactly one such entry.
    pub fn from_matrix(matrix: &DMatrix<f64>, threshold: f64) -> Result<Self> {
        let n = matrix.nrows();
        if matrix.ncols() != n {
            return Err(Error::mismatch(
                "permutation matrix",
                format!("{n}x{n}"),
                format!("{}x{}", n, matrix.ncols()),
            ));
        }
        let mut map = vec![usize::MAX; n];
        let mut valid_rows = 0;
        let mut col_hits = vec![0usize; n];
        for (r, row) in matrix.row_iter().enumerate() {
            let hits: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|(_, &v)| v > threshold)
                .map(|(c, _)| c)
                .collect();
            for &c in &hits {
                col_hits[c] += 1;
            }
            if hits.len() == 1 {
                map[r] = hits[0];
                valid_rows += 1;
            }
        }
        let valid_cols = col_hits.iter().filter(|&&h| h == 1).count();
        if valid_rows != n || valid_cols != n {
            return Err(Error::InvalidPermutation {
                rows: valid_rows,
                cols: valid_cols,
            });
        }
        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.map
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.map
    }

    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.map.len()];
        for (k, &target) in self.map.iter().enumerate() {
            inv[target] = k;
        }
        Self { map: inv }
    }

    /// `result[k] = self[inner[k]]`: follow `inner` first, then `self`.
    pub fn compose(&self, inner: &Permutation) -> Self {
        Self {
            map: inner.map.iter().map(|&m| self.map[m]).collect(),
        }
    }

    /// Number of moving rows whose match differs between the two permutations.
    pub fn changed_rows(&self, other: &Permutation) -> usize {
        self.map
            .iter()
            .zip(other.map.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    pub fn to_matrix(&self) -> DMatrix<f64> {
        let n = self.map.len();
        let mut m = DMatrix::zeros(n, n);
        for (k, &target) in self.map.iter().enumerate() {
            m[(k, target)] = 1.0;
        }
        m
    }

    /// Rearrange `moving` into reference row order: output row `map[k]` is
    /// input row `k`.
    pub fn reorder(&self, moving: &PointSet) -> Result<PointSet> {
        if self.map.len() != moving.nrows() {
            return Err(Error::mismatch(
                "permutation length",
                moving.nrows(),
                self.map.len(),
            ));
        }
        let mut out = PointSet::zeros(moving.nrows(), moving.ncols());
        for (k, &target) in self.map.iter().enumerate() {
            out.set_row(target, &moving.row(k));
        }
        Ok(out)
    }
}

/// Outcome of aligning one moving point set onto a reference set.
#[derive(Clone, Debug)]
pub struct Alignment {
    /// Square root of the summed squared distances of matched points.
    pub distance: f64,
    /// `moving[k] * rotation ≈ reference[permutation[k]]`.
    pub rotation: Rotation,
    pub permutation: Permutation,
    /// Final gating radius used to build the candidate pattern.
    pub gamma: f64,
    pub iterations: usize,
    /// `false` when the iteration cap or time limit ended the loop.
    pub converged: bool,
    /// Distance after the seed assignment and after every iteration.
    pub history: Vec<f64>,
}

impl Alignment {
    /// Move `moving` into the reference frame: reorder rows, then rotate.
    pub fn apply(&self, moving: &PointSet) -> Result<PointSet> {
        Ok(rotate(&self.permutation.reorder(moving)?, &self.rotation))
    }

    /// The same alignment seen from the other side of the pair.
    pub fn reversed(&self) -> Self {
        Self {
            rotation: self.rotation.transpose(),
            permutation: self.permutation.inverse(),
            ..self.clone()
        }
    }
}

/// Alignment of one shape into the frame of the base shape.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalAlignment {
    pub rotation: Rotation,
    pub permutation: Permutation,
}

impl GlobalAlignment {
    pub fn identity(n: usize) -> Self {
        Self {
            rotation: Rotation::identity(),
            permutation: Permutation::identity(n),
        }
    }

    /// Extend a chain by one edge: `edge` aligns the next shape onto the
    /// shape `self` already aligns onto the base.
    pub fn extend(&self, edge_rotation: &Rotation, edge_permutation: &Permutation) -> Self {
        Self {
            rotation: edge_rotation * self.rotation,
            permutation: self.permutation.compose(edge_permutation),
        }
    }

    pub fn apply(&self, moving: &PointSet) -> Result<PointSet> {
        Ok(rotate(&self.permutation.reorder(moving)?, &self.rotation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_repeated_targets() {
        assert!(Permutation::from_vec(vec![0, 2, 1]).is_ok());
        assert!(Permutation::from_vec(vec![0, 0, 1]).is_err());
        assert!(Permutation::from_vec(vec![0, 3, 1]).is_err());
    }

    #[test]
    fn inverse_and_compose_round_out_to_identity() {
        let p = Permutation::from_vec(vec![2, 0, 3, 1]).unwrap();
        assert_eq!(p.compose(&p.inverse()), Permutation::identity(4));
        assert_eq!(p.inverse().compose(&p), Permutation::identity(4));
    }

    #[test]
    fn matrix_form_has_one_entry_per_row_and_column() {
        let p = Permutation::from_vec(vec![1, 2, 0]).unwrap();
        let m = p.to_matrix();
        for i in 0..3 {
            assert_eq!(m.row(i).sum(), 1.0);
            assert_eq!(m.column(i).sum(), 1.0);
        }
        assert_eq!(m[(0, 1)], 1.0);
        assert_eq!(Permutation::from_matrix(&m, 0.1).unwrap(), p);
    }

    #[test]
    fn from_matrix_flags_split_rows() {
        let mut m = DMatrix::zeros(3, 3);
        m[(0, 0)] = 0.5;
        m[(0, 1)] = 0.5;
        m[(1, 1)] = 0.5;
        m[(1, 0)] = 0.5;
        m[(2, 2)] = 1.0;
        let err = Permutation::from_matrix(&m, 0.1).unwrap_err();
        assert_eq!(err, Error::InvalidPermutation { rows: 1, cols: 1 });
    }

    #[test]
    fn reorder_places_rows_at_their_targets() {
        let moving = PointSet::from_row_slice(3, 1, &[10.0, 20.0, 30.0]);
        let p = Permutation::from_vec(vec![2, 0, 1]).unwrap();
        let out = p.reorder(&moving).unwrap();
        assert_eq!(out.as_slice(), &[20.0, 30.0, 10.0]);
    }

    #[test]
    fn length_mismatch_is_rejected_instead_of_zero_filled() {
        let moving = PointSet::from_row_slice(3, 1, &[10.0, 20.0, 30.0]);
        let empty = GlobalAlignment::identity(0);
        assert!(matches!(
            empty.apply(&moving),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(Permutation::identity(2).reorder(&moving).is_err());
    }

    #[test]
    fn changed_rows_counts_differences() {
        let a = Permutation::from_vec(vec![0, 1, 2, 3]).unwrap();
        let b = Permutation::from_vec(vec![1, 0, 2, 3]).unwrap();
        assert_eq!(a.changed_rows(&b), 2);
        assert_eq!(a.changed_rows(&a), 0);
    }
}
