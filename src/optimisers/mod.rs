//! Alternating correspondence/rotation optimisers.
//!
//! [`LocalRefinement`] improves one starting rotation; [`MultiStartAlignment`]
//! runs it from every principal-axis seed and keeps the best result.

pub mod global;
pub mod local;

pub use global::MultiStartAlignment;
pub use local::LocalRefinement;

use crate::error::Result;
use crate::shape::{center, ensure_3d, ensure_same_shape, normalize};
use crate::types::PointSet;

/// Validate a pair and bring both sets into the frame refinement works in:
/// centred, and additionally scaled to unit centroid size when `scale` is set.
pub(crate) fn prepare(
    reference: &PointSet,
    moving: &PointSet,
    scale: bool,
) -> Result<(PointSet, PointSet)> {
    ensure_3d("reference point set", reference)?;
    ensure_same_shape("moving point set", reference, moving)?;
    if scale {
        let (reference, _) = normalize(reference)?;
        let (moving, _) = normalize(moving)?;
        Ok((reference, moving))
    } else {
        Ok((center(reference), center(moving)))
    }
}
