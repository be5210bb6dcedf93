use log::{debug, warn};

use crate::assignment::LinearAssignment;
use crate::core::AssignmentSolver;
use crate::error::{Error, Result};
use crate::estimators::principal_component_seeds;
use crate::models::Alignment;
use crate::settings::CorrespondenceSettings;
use crate::types::PointSet;

use super::{prepare, LocalRefinement};

/// Global-best pairwise alignment (gpd).
///
/// Runs [`LocalRefinement`] from every principal-axis seed and keeps the
/// alignment with the smallest distance; earlier seeds win ties. A seed whose
/// refinement fails is skipped; the call fails only if every seed does.
#[derive(Debug, Clone)]
pub struct MultiStartAlignment<A = LinearAssignment> {
    local: LocalRefinement<A>,
}

impl MultiStartAlignment<LinearAssignment> {
    pub fn new(settings: CorrespondenceSettings) -> Self {
        Self {
            local: LocalRefinement::new(settings),
        }
    }
}

impl<A: AssignmentSolver> MultiStartAlignment<A> {
    pub fn from_local(local: LocalRefinement<A>) -> Self {
        Self { local }
    }

    pub fn local(&self) -> &LocalRefinement<A> {
        &self.local
    }

    pub fn run(&self, reference: &PointSet, moving: &PointSet) -> Result<Alignment> {
        let settings = self.local.settings();
        let (reference, moving) = prepare(reference, moving, settings.scale)?;
        let seeds = principal_component_seeds(&reference, &moving, settings.mirror)?;

        let mut best: Option<Alignment> = None;
        let mut last_error = None;
        for (index, seed) in seeds.iter().enumerate() {
            match self.local.refine(&reference, &moving, seed) {
                Ok(candidate) => {
                    debug!(
                        "gpd seed {}: distance {:.6e} after {} iterations",
                        index, candidate.distance, candidate.iterations
                    );
                    if best.as_ref().map_or(true, |b| candidate.distance < b.distance) {
                        best = Some(candidate);
                    }
                }
                Err(err) => {
                    warn!("gpd seed {index} failed: {err}");
                    last_error = Some(err);
                }
            }
        }

        best.ok_or_else(|| {
            last_error.unwrap_or_else(|| Error::Degenerate("gpd: no candidate seeds".to_string()))
        })
    }
}
