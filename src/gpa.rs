//! Generalized Procrustes analysis.
//!
//! Configurations are centred (and scaled to unit centroid size when
//! `use_scaling` is set), then repeatedly rotated onto the running mean. The
//! mean starts as the first configuration and is re-estimated after every
//! sweep. Iteration stops once the mean moves less than `tolerance` in
//! Frobenius norm or after `max_iterations` sweeps.
//!
//! Row order is taken as the landmark correspondence; run the pairwise
//! correspondence engine first when it is not known.

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector, SVD};

use crate::error::{Error, Result};
use crate::estimators::fit_rotation;
use crate::settings::GpaSettings;
use crate::shape::{center, centroid_size, ensure_same_shape, normalize};
use crate::types::{PointSet, RotationMatrix};

#[derive(Debug, Clone)]
pub struct GpaResult {
    /// Configurations in the consensus frame, in input order.
    pub aligned: Vec<PointSet>,
    pub mean: PointSet,
    /// Centroid size of every input before any scaling.
    pub centroid_sizes: Vec<f64>,
    /// `prepared[k] * rotations[k] == aligned[k]` (up to re-centring).
    pub rotations: Vec<RotationMatrix>,
    /// Frobenius distance of every aligned configuration to the mean.
    pub procrustes_distances: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Mean-shape change of the last sweep.
    pub final_change: f64,
}

impl GpaResult {
    pub fn did_converge(&self) -> bool {
        self.converged
    }

    pub fn shape_pca(&self) -> Result<ShapePca> {
        shape_pca(&self.aligned)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Gpa {
    settings: GpaSettings,
}

impl Gpa {
    pub fn new(settings: GpaSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GpaSettings {
        &self.settings
    }

    pub fn run(&self, shapes: &[PointSet]) -> Result<GpaResult> {
        validate(shapes)?;
        let settings = &self.settings;

        let centroid_sizes: Vec<f64> = shapes.iter().map(centroid_size).collect();
        let prepared: Vec<PointSet> = if settings.use_scaling {
            shapes
                .iter()
                .map(|s| normalize(s).map(|(unit, _)| unit))
                .collect::<Result<_>>()?
        } else {
            shapes.iter().map(center).collect()
        };

        let mut mean = prepared[0].clone();
        let mut aligned = prepared.clone();
        let mut rotations = vec![RotationMatrix::identity(mean.ncols(), mean.ncols()); shapes.len()];
        let mut change = f64::INFINITY;
        let mut iterations = 0;

        while change > settings.tolerance && iterations < settings.max_iterations {
            for (k, shape) in prepared.iter().enumerate() {
                let rotation = fit_rotation(shape, &mean, settings.reflection)?;
                let rotated = shape * &rotation;
                aligned[k] = if settings.use_scaling {
                    rotated
                } else {
                    center(&rotated)
                };
                rotations[k] = rotation;
            }

            let next = self.consensus(&aligned)?;
            change = (&mean - &next).norm();
            mean = next;
            iterations += 1;
            debug!("gpa sweep {iterations}: mean moved {change:.6e}");
        }

        let converged = change <= settings.tolerance;
        if converged {
            info!("gpa converged after {iterations} sweeps over {} shapes", shapes.len());
        } else {
            warn!(
                "gpa stopped after {iterations} sweeps with mean change {change:.3e} above {:.1e}",
                settings.tolerance
            );
        }

        let procrustes_distances = aligned.iter().map(|a| (a - &mean).norm()).collect();
        Ok(GpaResult {
            aligned,
            mean,
            centroid_sizes,
            rotations,
            procrustes_distances,
            iterations,
            converged,
            final_change: change,
        })
    }

    fn consensus(&self, aligned: &[PointSet]) -> Result<PointSet> {
        let mut sum = PointSet::zeros(aligned[0].nrows(), aligned[0].ncols());
        for shape in aligned {
            sum += shape;
        }
        let average = sum / aligned.len() as f64;
        if self.settings.use_scaling {
            normalize(&average).map(|(unit, _)| unit)
        } else {
            Ok(center(&average))
        }
    }
}

fn validate(shapes: &[PointSet]) -> Result<()> {
    let Some(first) = shapes.first() else {
        return Err(Error::InvalidInput("gpa: no configurations".to_string()));
    };
    if !(2..=3).contains(&first.ncols()) {
        return Err(Error::InvalidInput(format!(
            "gpa: configurations must be 2D or 3D, got {} columns",
            first.ncols()
        )));
    }
    if first.nrows() == 0 {
        return Err(Error::InvalidInput("gpa: empty configuration".to_string()));
    }
    for shape in &shapes[1..] {
        ensure_same_shape("gpa configuration", first, shape)?;
    }
    Ok(())
}

/// Principal components of an aligned population.
///
/// Every configuration is flattened point by point (`x0, y0, z0, x1, ...`).
/// Components are ordered by decreasing variance.
#[derive(Debug, Clone)]
pub struct ShapePca {
    pub mean: PointSet,
    /// Per-component variance, `s² / (K - 1)`.
    pub variances: DVector<f64>,
    pub proportions: DVector<f64>,
    /// One unit-length loading vector per row.
    pub components: DMatrix<f64>,
    /// `scores[(k, c)]`: coordinate of configuration `k` along component `c`.
    pub scores: DMatrix<f64>,
}

impl ShapePca {
    pub fn num_components(&self) -> usize {
        self.variances.len()
    }

    /// Mean shape displaced by `weight` along component `index`.
    pub fn mode_shape(&self, index: usize, weight: f64) -> Option<PointSet> {
        if index >= self.num_components() {
            return None;
        }
        let dim = self.mean.ncols();
        let component = self.components.row(index);
        Some(PointSet::from_fn(self.mean.nrows(), dim, |p, d| {
            self.mean[(p, d)] + weight * component[p * dim + d]
        }))
    }
}

pub fn shape_pca(aligned: &[PointSet]) -> Result<ShapePca> {
    if aligned.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "shape pca: needs at least 2 configurations, got {}",
            aligned.len()
        )));
    }
    let first = &aligned[0];
    for shape in &aligned[1..] {
        ensure_same_shape("shape pca configuration", first, shape)?;
    }
    let (n, dim) = first.shape();
    let k = aligned.len();

    let data = DMatrix::from_fn(k, n * dim, |s, f| aligned[s][(f / dim, f % dim)]);
    let column_mean = data.row_mean();
    let mut centred = data;
    for mut row in centred.row_iter_mut() {
        row -= &column_mean;
    }

    let svd = SVD::new(centred.clone(), false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| Error::Degenerate("shape pca: SVD did not return Vᵀ".to_string()))?;

    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));

    let variances = DVector::from_iterator(
        order.len(),
        order
            .iter()
            .map(|&c| svd.singular_values[c].powi(2) / (k - 1) as f64),
    );
    let total = variances.sum();
    let proportions = if total > 0.0 {
        &variances / total
    } else {
        DVector::zeros(variances.len())
    };
    let components = DMatrix::from_fn(order.len(), n * dim, |c, f| v_t[(order[c], f)]);
    let scores = &centred * components.transpose();
    let mean = PointSet::from_fn(n, dim, |p, d| column_mean[p * dim + d]);

    Ok(ShapePca {
        mean,
        variances,
        proportions,
        components,
        scores,
    })
}
