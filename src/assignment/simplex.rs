//! Dense Big-M simplex for equality-form linear programs.
//!
//! Solves `min cᵀx` subject to `A x = b`, `x ≥ 0`. Every equality row gets an
//! artificial variable whose penalty dominates any cost; the penalty is kept
//! in its own objective row so it never swamps the costs numerically. Bland's
//! rule picks the entering and leaving variables so degenerate problems
//! (assignment LPs are highly degenerate) cannot cycle.

use nalgebra::{DMatrix, DVector};

use crate::core::LinearProgramSolver;
use crate::error::{Error, Result};
use crate::settings::SimplexSettings;

/// `min cᵀx` s.t. `a_eq x = b_eq`, `x ≥ 0`.
#[derive(Debug, Clone)]
pub struct LinearProgram {
    pub objective: DVector<f64>,
    pub a_eq: DMatrix<f64>,
    pub b_eq: DVector<f64>,
}

impl LinearProgram {
    pub fn new(objective: DVector<f64>, a_eq: DMatrix<f64>, b_eq: DVector<f64>) -> Result<Self> {
        if a_eq.ncols() != objective.len() {
            return Err(Error::mismatch(
                "linear program columns",
                objective.len(),
                a_eq.ncols(),
            ));
        }
        if a_eq.nrows() != b_eq.len() {
            return Err(Error::mismatch("linear program rows", b_eq.len(), a_eq.nrows()));
        }
        Ok(Self {
            objective,
            a_eq,
            b_eq,
        })
    }

    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }
}

#[derive(Debug, Clone)]
pub struct LpSolution {
    pub x: DVector<f64>,
    pub objective: f64,
    pub iterations: usize,
}

/// Tableau simplex with lexicographic Big-M artificials and Bland's rule.
#[derive(Debug, Clone, Default)]
pub struct DenseSimplex {
    settings: SimplexSettings,
}

impl DenseSimplex {
    pub fn new(settings: SimplexSettings) -> Self {
        Self { settings }
    }
}

impl LinearProgramSolver for DenseSimplex {
    fn minimize(&self, problem: &LinearProgram) -> Result<LpSolution> {
        let n = problem.num_variables();
        let m = problem.b_eq.len();
        if n == 0 {
            return Err(Error::InvalidInput("simplex: empty objective".to_string()));
        }
        let tol = self.settings.tolerance;

        // Columns: structural variables, artificials, rhs. Row `cost` holds the
        // reduced costs, row `penalty` the reduced infeasibility; together they
        // form the Big-M objective `penalty * M + cost` without a numeric M.
        let n_total = n + m;
        let rhs = n_total;
        let cost = m;
        let penalty = m + 1;
        let mut t = DMatrix::<f64>::zeros(m + 2, n_total + 1);
        let mut basis: Vec<usize> = (n..n_total).collect();

        for i in 0..m {
            let sign = if problem.b_eq[i] < 0.0 { -1.0 } else { 1.0 };
            for j in 0..n {
                t[(i, j)] = sign * problem.a_eq[(i, j)];
            }
            t[(i, n + i)] = 1.0;
            t[(i, rhs)] = sign * problem.b_eq[i];
        }
        for j in 0..n {
            t[(cost, j)] = problem.objective[j];
        }
        // Price out the artificial basis.
        for j in 0..=rhs {
            if !(n..n_total).contains(&j) {
                t[(penalty, j)] = -(0..m).map(|i| t[(i, j)]).sum::<f64>();
            }
        }

        let mut iterations = 0;
        loop {
            // Bland: lowest improving column, infeasibility first.
            let entering = (0..n_total)
                .find(|&j| t[(penalty, j)] < -tol)
                .or_else(|| {
                    (0..n_total).find(|&j| t[(penalty, j)].abs() <= tol && t[(cost, j)] < -tol)
                });
            let Some(enter) = entering else {
                break;
            };

            let mut leave: Option<usize> = None;
            let mut best_ratio = f64::INFINITY;
            for i in 0..m {
                let a = t[(i, enter)];
                if a > tol {
                    let ratio = t[(i, rhs)] / a;
                    let better = ratio < best_ratio - tol
                        || (ratio <= best_ratio + tol
                            && leave.is_some_and(|l| basis[i] < basis[l]));
                    if leave.is_none() || better {
                        best_ratio = ratio;
                        leave = Some(i);
                    }
                }
            }
            let Some(leave) = leave else {
                return Err(Error::Infeasible("simplex: problem is unbounded".to_string()));
            };

            pivot(&mut t, leave, enter);
            basis[leave] = enter;
            iterations += 1;
            if iterations >= self.settings.max_iterations {
                return Err(Error::Convergence(format!(
                    "simplex: no optimum after {iterations} pivots"
                )));
            }
        }

        let mut x = DVector::zeros(n);
        for (i, &b) in basis.iter().enumerate() {
            let value = t[(i, rhs)];
            if b >= n {
                if value > tol.max(1e-7) {
                    return Err(Error::Infeasible(
                        "simplex: artificial variable left in the basis".to_string(),
                    ));
                }
            } else {
                x[b] = value;
            }
        }
        let objective = problem.objective.dot(&x);
        Ok(LpSolution {
            x,
            objective,
            iterations,
        })
    }
}

fn pivot(t: &mut DMatrix<f64>, row: usize, col: usize) {
    let p = t[(row, col)];
    {
        let mut r = t.row_mut(row);
        r /= p;
    }
    let pivot_row = t.row(row).into_owned();
    for i in 0..t.nrows() {
        if i == row {
            continue;
        }
        let factor = t[(i, col)];
        if factor != 0.0 {
            for (j, &pv) in pivot_row.iter().enumerate() {
                t[(i, j)] -= factor * pv;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_equality_program() {
        // min x0 + 2 x1 + 3 x2  s.t.  x0 + x1 + x2 = 1, x1 + x2 = 0.5
        let lp = LinearProgram::new(
            DVector::from_vec(vec![1.0, 2.0, 3.0]),
            DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 1.0, 0.0, 1.0, 1.0]),
            DVector::from_vec(vec![1.0, 0.5]),
        )
        .unwrap();
        let sol = DenseSimplex::default().minimize(&lp).unwrap();
        assert!((sol.objective - 1.5).abs() < 1e-9);
        assert!((sol.x[0] - 0.5).abs() < 1e-9);
        assert!((sol.x[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn detects_infeasible_program() {
        // x0 = 1 and x0 = 2 cannot both hold.
        let lp = LinearProgram::new(
            DVector::from_vec(vec![1.0]),
            DMatrix::from_row_slice(2, 1, &[1.0, 1.0]),
            DVector::from_vec(vec![1.0, 2.0]),
        )
        .unwrap();
        assert!(matches!(
            DenseSimplex::default().minimize(&lp),
            Err(Error::Infeasible(_))
        ));
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let err = LinearProgram::new(
            DVector::from_vec(vec![1.0, 1.0]),
            DMatrix::zeros(1, 3),
            DVector::from_vec(vec![1.0]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
