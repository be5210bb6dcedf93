//! High-level API for point-set correspondence and Procrustes analysis.
//!
//! These functions validate their inputs, fill in default settings and
//! dispatch to the engine types ([`MultiStartAlignment`], [`LocalRefinement`],
//! [`Correspondence`], [`Gpa`]). They mirror the functions exposed to Python.

use std::collections::BTreeMap;

use crate::correspondence::{Correspondence, CorrespondenceResult};
use crate::error::Result;
use crate::estimators;
use crate::gpa::{self, Gpa, GpaResult, ShapePca};
use crate::models::{Alignment, Permutation};
use crate::optimisers::{LocalRefinement, MultiStartAlignment};
use crate::settings::{CorrespondenceSettings, GpaSettings, Reflection};
use crate::shape::{ensure_3d, ensure_same_shape, rotate};
use crate::types::{PointSet, Rotation};

/// Best rotation carrying `source` onto the row-matched `target`.
///
/// # Arguments
/// * `source` - Moving points (Nx3)
/// * `target` - Reference points (Nx3), row `k` matched to row `k` of `source`
/// * `reflection` - Whether an improper result is allowed
pub fn kabsch(source: &PointSet, target: &PointSet, reflection: Reflection) -> Result<Rotation> {
    ensure_3d("kabsch source", source)?;
    ensure_same_shape("kabsch target", source, target)?;
    estimators::kabsch(source, target, reflection)
}

/// Global-best alignment of `moving` onto `reference` over all principal-axis
/// seeds.
///
/// # Arguments
/// * `reference` - Reference points (Nx3)
/// * `moving` - Points to align (Nx3), in any row order
/// * `settings` - Optional settings (uses defaults if None)
///
/// # Returns
/// The [`Alignment`] with the smallest distance; its permutation maps rows of
/// `moving` to rows of `reference`.
pub fn gpd(
    reference: &PointSet,
    moving: &PointSet,
    settings_opt: Option<CorrespondenceSettings>,
) -> Result<Alignment> {
    MultiStartAlignment::new(settings_opt.unwrap_or_default()).run(reference, moving)
}

/// Local refinement of `moving` onto `reference` from a single `seed`.
pub fn locgpd(
    reference: &PointSet,
    moving: &PointSet,
    seed: &Rotation,
    settings_opt: Option<CorrespondenceSettings>,
) -> Result<Alignment> {
    LocalRefinement::new(settings_opt.unwrap_or_default()).run(reference, moving, seed)
}

/// Align every pair of `shapes` and, unless disabled, express all of them in
/// the frame of the base shape.
///
/// # Arguments
/// * `shapes` - Point sets with identical size (Nx3 each)
/// * `initial` - Optional seed rotations keyed by pair `(i, j)`
/// * `settings` - Optional settings (uses defaults if None)
pub fn correspondence(
    shapes: &[PointSet],
    initial: Option<&BTreeMap<(usize, usize), Rotation>>,
    settings_opt: Option<CorrespondenceSettings>,
) -> Result<CorrespondenceResult> {
    Correspondence::new(settings_opt.unwrap_or_default()).run(shapes, initial)
}

/// Generalized Procrustes analysis of row-corresponded configurations
/// (Nx2 or Nx3 each).
pub fn run_gpa(shapes: &[PointSet], settings_opt: Option<GpaSettings>) -> Result<GpaResult> {
    Gpa::new(settings_opt.unwrap_or_default()).run(shapes)
}

/// Principal components of a GPA-aligned population.
pub fn shape_pca(result: &GpaResult) -> Result<ShapePca> {
    gpa::shape_pca(&result.aligned)
}

/// Reorder `moving` into reference row order and rotate it.
///
/// Output row `permutation[k]` is `moving[k] * rotation`.
pub fn apply_alignment(
    moving: &PointSet,
    rotation: &Rotation,
    permutation: &Permutation,
) -> Result<PointSet> {
    ensure_3d("aligned point set", moving)?;
    Ok(rotate(&permutation.reorder(moving)?, rotation))
}
