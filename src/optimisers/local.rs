use std::time::Instant;

use log::{debug, warn};

use crate::assignment::{Candidates, LinearAssignment};
use crate::core::{
    AssignmentSolver, RefinementState, RefinementTermination, Termination, TerminationCriterion,
};
use crate::error::Result;
use crate::estimators::kabsch;
use crate::models::Alignment;
use crate::scoring::{candidates_within, gating_radius, matched_cost};
use crate::settings::CorrespondenceSettings;
use crate::shape::{rotate, squared_distances};
use crate::types::{PointSet, Rotation};

use super::prepare;

/// Local generalized Procrustes distance refinement.
///
/// Starting from a seed rotation, alternates between the best rotation for
/// the current matching and the best matching among nearby pairs for the
/// current rotation. Neither step can increase the summed squared distance,
/// so the recorded distance history is non-increasing.
#[derive(Debug, Clone)]
pub struct LocalRefinement<A = LinearAssignment> {
    solver: A,
    settings: CorrespondenceSettings,
}

impl LocalRefinement<LinearAssignment> {
    pub fn new(settings: CorrespondenceSettings) -> Self {
        let solver = LinearAssignment::new(settings.lp_strategy, settings.simplex);
        Self { solver, settings }
    }
}

impl<A: AssignmentSolver> LocalRefinement<A> {
    pub fn with_solver(solver: A, settings: CorrespondenceSettings) -> Self {
        Self { solver, settings }
    }

    pub fn settings(&self) -> &CorrespondenceSettings {
        &self.settings
    }

    /// Align `moving` onto `reference` starting from `seed`.
    pub fn run(&self, reference: &PointSet, moving: &PointSet, seed: &Rotation) -> Result<Alignment> {
        let (reference, moving) = prepare(reference, moving, self.settings.scale)?;
        self.refine(&reference, &moving, seed)
    }

    /// Refinement on already prepared (centred, optionally scaled) sets.
    pub(crate) fn refine(
        &self,
        reference: &PointSet,
        moving: &PointSet,
        seed: &Rotation,
    ) -> Result<Alignment> {
        let started = Instant::now();
        let reflection = self.settings.reflection();
        let mut termination = RefinementTermination::from_settings(&self.settings);

        let sq = squared_distances(&rotate(moving, seed), reference);
        let initial = self.solver.solve(&sq, &Candidates::All)?;
        let mut permutation = initial.permutation;
        let mut cost = initial.cost;
        let mut rotation: Rotation;
        let mut gamma: f64;
        let mut history = vec![cost.max(0.0).sqrt()];
        let mut iteration = 0;

        let stop = loop {
            iteration += 1;
            rotation = kabsch(&permutation.reorder(moving)?, reference, reflection)?;

            let sq = squared_distances(&rotate(moving, &rotation), reference);
            let fitted = matched_cost(&sq, &permutation);
            gamma = gating_radius(&sq, &permutation, self.settings.gating_factor)?;
            if gamma == 0.0 {
                cost = fitted;
                history.push(fitted.max(0.0).sqrt());
                break Termination::Converged;
            }

            let next = self
                .solver
                .solve(&sq, &candidates_within(&sq, gamma))?;
            let state = RefinementState {
                iteration,
                previous_distance: cost.max(0.0).sqrt(),
                distance: next.cost.max(0.0).sqrt(),
                changed_rows: next.permutation.changed_rows(&permutation),
            };
            permutation = next.permutation;
            cost = next.cost;
            history.push(state.distance);
            debug!(
                "locgpd iteration {}: distance {:.6e}, gamma {:.4e}, {} rows changed",
                iteration, state.distance, gamma, state.changed_rows
            );

            if let Some(stop) = termination.check(&state) {
                break stop;
            }
        };

        if !stop.converged() {
            warn!(
                "locgpd stopped without converging ({:?}) after {} iterations in {:?}",
                stop,
                iteration,
                started.elapsed()
            );
        }

        Ok(Alignment {
            distance: cost.max(0.0).sqrt(),
            rotation,
            permutation,
            gamma,
            iterations: iteration,
            converged: stop.converged(),
            history,
        })
    }
}
