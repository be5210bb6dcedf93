//! Minimum-cost perfect matching (Hungarian algorithm, potentials form).
//!
//! The solver grows the matching one row at a time along shortest augmenting
//! paths in reduced costs. Entries outside the candidate pattern are never
//! relaxed, so the same routine solves dense and restricted problems; a row
//! that cannot reach a free column reports [`Error::Infeasible`].

use crate::error::{Error, Result};

/// Solve an `n × n` assignment given a cost oracle.
///
/// `cost(r, c)` returns `None` for forbidden pairs. Returns `map` with
/// `map[r]` the column assigned to row `r`, and the total cost.
pub fn solve_with<F>(n: usize, cost: F) -> Result<(Vec<usize>, f64)>
where
    F: Fn(usize, usize) -> Option<f64>,
{
    if n == 0 {
        return Ok((Vec::new(), 0.0));
    }

    // 1-based; index 0 is the virtual column used to start each phase.
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        p[0] = row;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                if let Some(c) = cost(i0 - 1, j - 1) {
                    if !c.is_finite() {
                        return Err(Error::Degenerate(format!(
                            "assignment cost ({}, {}) is not finite",
                            i0 - 1,
                            j - 1
                        )));
                    }
                    let reduced = c - u[i0] - v[j];
                    if reduced < minv[j] {
                        minv[j] = reduced;
                        way[j] = j0;
                    }
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            if j1 == 0 || !delta.is_finite() {
                return Err(Error::Infeasible(format!(
                    "row {} has no augmenting path inside the candidate pattern",
                    row - 1
                )));
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut map = vec![0usize; n];
    for j in 1..=n {
        map[p[j] - 1] = j - 1;
    }
    let total = map
        .iter()
        .enumerate()
        .filter_map(|(r, &c)| cost(r, c))
        .sum();
    Ok((map, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(cost: &[Vec<f64>]) -> f64 {
        fn go(cost: &[Vec<f64>], row: usize, used: &mut Vec<bool>) -> f64 {
            if row == cost.len() {
                return 0.0;
            }
            let mut best = f64::INFINITY;
            for c in 0..cost.len() {
                if !used[c] {
                    used[c] = true;
                    best = best.min(cost[row][c] + go(cost, row + 1, used));
                    used[c] = false;
                }
            }
            best
        }
        go(cost, 0, &mut vec![false; cost.len()])
    }

    #[test]
    fn matches_brute_force_on_small_matrix() {
        let cost = vec![
            vec![4.0, 1.0, 3.0, 7.0],
            vec![2.0, 0.0, 5.0, 1.0],
            vec![3.0, 2.0, 2.0, 6.0],
            vec![8.0, 4.0, 1.0, 3.0],
        ];
        let (map, total) = solve_with(4, |r, c| Some(cost[r][c])).unwrap();
        assert!((total - brute_force(&cost)).abs() < 1e-12);

        let mut seen = map.clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn respects_forbidden_pairs() {
        // The cheapest dense answer uses (0, 0); forbid it.
        let cost = [[0.0, 5.0], [5.0, 0.0]];
        let (map, total) =
            solve_with(2, |r, c| if r == 0 && c == 0 { None } else { Some(cost[r][c]) }).unwrap();
        assert_eq!(map, vec![1, 0]);
        assert!((total - 10.0).abs() < 1e-12);
    }

    #[test]
    fn reports_patterns_without_perfect_matching() {
        // Both rows may only use column 0.
        let result = solve_with(2, |_, c| if c == 0 { Some(1.0) } else { None });
        assert!(matches!(result, Err(Error::Infeasible(_))));
    }

    #[test]
    fn empty_problem_is_trivial() {
        let (map, total) = solve_with(0, |_, _| Some(1.0)).unwrap();
        assert!(map.is_empty());
        assert_eq!(total, 0.0);
    }
}
