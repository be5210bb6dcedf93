//! Linear assignment: dense Hungarian, identity shortcut and restricted
//! (sparse candidate) solves.
//!
//! The restricted case is the one the local refinement loop hits on every
//! iteration. It is solved either exactly, by a Hungarian pass that only
//! walks allowed pairs, or as the LP relaxation of the assignment polytope
//! rounded back to a permutation.

pub mod hungarian;
pub mod simplex;

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::core::{AssignmentSolver, LinearProgramSolver};
use crate::error::{Error, Result};
use crate::models::Permutation;
use crate::settings::{LpStrategy, SimplexSettings};
use crate::types::CostMatrix;

pub use simplex::{DenseSimplex, LinearProgram, LpSolution};

/// Allowed (row, column) pairs, stored per row in ascending column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparsePattern {
    rows: Vec<Vec<usize>>,
}

impl SparsePattern {
    pub fn from_rows(mut rows: Vec<Vec<usize>>) -> Self {
        for row in rows.iter_mut() {
            row.sort_unstable();
            row.dedup();
        }
        Self { rows }
    }

    /// Keep every pair for which `allowed(r, c)` holds.
    pub fn from_predicate<F>(n: usize, allowed: F) -> Self
    where
        F: Fn(usize, usize) -> bool,
    {
        Self {
            rows: (0..n)
                .map(|r| (0..n).filter(|&c| allowed(r, c)).collect())
                .collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn row(&self, r: usize) -> &[usize] {
        &self.rows[r]
    }

    pub fn contains(&self, r: usize, c: usize) -> bool {
        self.rows
            .get(r)
            .is_some_and(|row| row.binary_search(&c).is_ok())
    }

    pub fn is_dense(&self) -> bool {
        let n = self.rows.len();
        self.rows.iter().all(|row| row.len() == n)
    }

    /// 0/1 mask matrix.
    pub fn to_mask(&self) -> DMatrix<f64> {
        let n = self.rows.len();
        let mut m = DMatrix::zeros(n, n);
        for (r, row) in self.rows.iter().enumerate() {
            for &c in row {
                m[(r, c)] = 1.0;
            }
        }
        m
    }
}

/// Which pairs an assignment may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// Unrestricted: every row may match every column.
    All,
    /// No matching requested; the identity at zero cost.
    None,
    Sparse(SparsePattern),
}

impl Candidates {
    /// Interpret a 0/1 mask matrix: all ones is unrestricted, all zeros is
    /// the identity shortcut, anything else is a sparse pattern.
    pub fn from_mask(mask: &DMatrix<f64>) -> Self {
        if mask.iter().all(|&v| v != 0.0) {
            Candidates::All
        } else if mask.iter().all(|&v| v == 0.0) {
            Candidates::None
        } else {
            let n = mask.nrows();
            Candidates::Sparse(SparsePattern::from_predicate(n, |r, c| mask[(r, c)] != 0.0))
        }
    }
}

/// A permutation together with its total cost.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub permutation: Permutation,
    pub cost: f64,
}

/// Default [`AssignmentSolver`].
///
/// Dense candidates go through the Hungarian algorithm. Sparse candidates use
/// `strategy`: [`LpStrategy::Exact`] restricts the Hungarian search to the
/// pattern; [`LpStrategy::Simplex`] solves the LP relaxation with `L`,
/// discards values below `round_threshold` and rejects the result if it is
/// not a permutation.
#[derive(Debug, Clone)]
pub struct LinearAssignment<L = DenseSimplex> {
    strategy: LpStrategy,
    round_threshold: f64,
    lp: L,
}

impl Default for LinearAssignment<DenseSimplex> {
    fn default() -> Self {
        Self::new(LpStrategy::Exact, SimplexSettings::default())
    }
}

impl LinearAssignment<DenseSimplex> {
    pub fn new(strategy: LpStrategy, simplex: SimplexSettings) -> Self {
        Self {
            strategy,
            round_threshold: simplex.round_threshold,
            lp: DenseSimplex::new(simplex),
        }
    }
}

impl<L: LinearProgramSolver> LinearAssignment<L> {
    /// Use a custom LP backend for the sparse path.
    pub fn with_lp_solver(lp: L, round_threshold: f64) -> Self {
        Self {
            strategy: LpStrategy::Simplex,
            round_threshold,
            lp,
        }
    }

    pub fn strategy(&self) -> LpStrategy {
        self.strategy
    }

    fn solve_lp(&self, cost: &CostMatrix, pattern: &SparsePattern) -> Result<Assignment> {
        let n = pattern.size();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|r| pattern.row(r).iter().map(move |&c| (r, c)))
            .collect();

        let objective = DVector::from_iterator(pairs.len(), pairs.iter().map(|&(r, c)| cost[(r, c)]));
        let mut a_eq = DMatrix::zeros(2 * n, pairs.len());
        for (k, &(r, c)) in pairs.iter().enumerate() {
            a_eq[(r, k)] = 1.0;
            a_eq[(n + c, k)] = 1.0;
        }
        let b_eq = DVector::from_element(2 * n, 1.0);
        let problem = LinearProgram::new(objective, a_eq, b_eq)?;

        let solution = self.lp.minimize(&problem)?;
        debug!(
            "assignment LP: {} variables, {} pivots, objective {:.6e}",
            pairs.len(),
            solution.iterations,
            solution.objective
        );

        let mut x = DMatrix::zeros(n, n);
        for (k, &(r, c)) in pairs.iter().enumerate() {
            x[(r, c)] = solution.x[k];
        }
        let permutation = Permutation::from_matrix(&x, self.round_threshold)?;
        let total = permutation
            .as_slice()
            .iter()
            .enumerate()
            .map(|(r, &c)| cost[(r, c)])
            .sum();
        Ok(Assignment {
            permutation,
            cost: total,
        })
    }
}

impl<L: LinearProgramSolver> AssignmentSolver for LinearAssignment<L> {
    fn solve(&self, cost: &CostMatrix, candidates: &Candidates) -> Result<Assignment> {
        let n = cost.nrows();
        if cost.ncols() != n {
            return Err(Error::mismatch(
                "assignment cost matrix",
                format!("{n}x{n}"),
                format!("{}x{}", n, cost.ncols()),
            ));
        }

        match candidates {
            Candidates::None => Ok(Assignment {
                permutation: Permutation::identity(n),
                cost: 0.0,
            }),
            Candidates::All => dense(cost),
            Candidates::Sparse(pattern) => {
                if pattern.size() != n {
                    return Err(Error::mismatch("candidate pattern", n, pattern.size()));
                }
                if pattern.is_dense() {
                    return dense(cost);
                }
                match self.strategy {
                    LpStrategy::Exact => {
                        let (map, total) = hungarian::solve_with(n, |r, c| {
                            pattern.contains(r, c).then(|| cost[(r, c)])
                        })?;
                        Ok(Assignment {
                            permutation: Permutation::from_vec_unchecked(map),
                            cost: total,
                        })
                    }
                    LpStrategy::Simplex => self.solve_lp(cost, pattern),
                }
            }
        }
    }
}

fn dense(cost: &CostMatrix) -> Result<Assignment> {
    let (map, total) = hungarian::solve_with(cost.nrows(), |r, c| Some(cost[(r, c)]))?;
    Ok(Assignment {
        permutation: Permutation::from_vec_unchecked(map),
        cost: total,
    })
}
