//! Point subsampling ahead of correspondence.
//!
//! Dense scans are reduced to a few hundred points before pairwise
//! alignment. Both strategies return the chosen rows alongside their indices
//! into the input, so a correspondence found on the subsample can be traced
//! back to the full set.

use rand::prelude::*;
use rand::seq::index;

use crate::error::{Error, Result};
use crate::types::PointSet;

#[derive(Debug, Clone)]
pub struct Subsample {
    pub points: PointSet,
    /// Row of the input each subsampled point came from.
    pub indices: Vec<usize>,
}

impl Subsample {
    fn gather(points: &PointSet, indices: Vec<usize>) -> Self {
        Self {
            points: points.select_rows(indices.iter()),
            indices,
        }
    }
}

fn check_count(points: &PointSet, count: usize) -> Result<()> {
    if count == 0 || count > points.nrows() {
        return Err(Error::InvalidInput(format!(
            "subsample: cannot take {count} of {} points",
            points.nrows()
        )));
    }
    Ok(())
}

/// Greedy farthest-point sampling starting from row `start`.
///
/// Each step adds the point farthest from everything chosen so far; ties go
/// to the lowest row. Deterministic for a given input.
pub fn farthest_point(points: &PointSet, count: usize, start: usize) -> Result<Subsample> {
    check_count(points, count)?;
    if start >= points.nrows() {
        return Err(Error::InvalidInput(format!(
            "subsample: start row {start} out of range for {} points",
            points.nrows()
        )));
    }

    let mut chosen = Vec::with_capacity(count);
    let mut nearest = vec![f64::INFINITY; points.nrows()];
    let mut next = start;
    while chosen.len() < count {
        chosen.push(next);
        let picked = points.row(next);
        for (k, d) in nearest.iter_mut().enumerate() {
            *d = d.min((points.row(k) - picked).norm_squared());
        }
        next = nearest
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (k, &d)| {
                if d > best.1 {
                    (k, d)
                } else {
                    best
                }
            })
            .0;
    }
    Ok(Subsample::gather(points, chosen))
}

/// Uniform sample of `count` distinct rows, kept in ascending row order.
///
/// With `seed` the draw is reproducible; without it the RNG is seeded from
/// the operating system.
pub fn random(points: &PointSet, count: usize, seed: Option<u64>) -> Result<Subsample> {
    check_count(points, count)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut chosen = index::sample(&mut rng, points.nrows(), count).into_vec();
    chosen.sort_unstable();
    Ok(Subsample::gather(points, chosen))
}
