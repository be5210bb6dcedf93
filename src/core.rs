//! Core traits of the correspondence engine.
//!
//! The refinement loops are written against these seams:
//! - [`AssignmentSolver`]: minimum-cost matching under a candidate pattern
//! - [`LinearProgramSolver`]: the LP capability behind the sparse assignment path
//! - [`TerminationCriterion`]: when the alternating correspondence/rotation loop stops

use std::time::{Duration, Instant};

use crate::assignment::simplex::{LinearProgram, LpSolution};
use crate::assignment::{Assignment, Candidates};
use crate::error::Result;
use crate::settings::CorrespondenceSettings;
use crate::types::CostMatrix;

/// Solves the assignment problem between the rows (moving points) and the
/// columns (reference points) of a square cost matrix.
pub trait AssignmentSolver {
    /// Return the minimum-cost permutation whose pairs all lie inside
    /// `candidates`, together with its total cost.
    fn solve(&self, cost: &CostMatrix, candidates: &Candidates) -> Result<Assignment>;
}

/// Minimises a linear objective under equality constraints and `x ≥ 0`.
pub trait LinearProgramSolver {
    fn minimize(&self, problem: &LinearProgram) -> Result<LpSolution>;
}

/// Snapshot of the refinement loop handed to a [`TerminationCriterion`].
#[derive(Debug, Clone, Copy)]
pub struct RefinementState {
    /// Iterations completed so far (1 after the first re-fit).
    pub iteration: usize,
    pub previous_distance: f64,
    pub distance: f64,
    /// Moving rows whose match changed in this iteration.
    pub changed_rows: usize,
}

/// Why the refinement loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The permutation stopped changing or the improvement became negligible.
    Converged,
    IterationCap,
    TimeLimit,
}

impl Termination {
    pub fn converged(self) -> bool {
        self == Termination::Converged
    }
}

/// Decides after every iteration whether the loop should stop.
pub trait TerminationCriterion {
    fn check(&mut self, state: &RefinementState) -> Option<Termination>;
}

/// Stops on a stable permutation, a relative improvement below tolerance,
/// the iteration cap, or an optional wall-clock deadline.
#[derive(Debug, Clone)]
pub struct RefinementTermination {
    pub max_iterations: usize,
    pub relative_tolerance: f64,
    deadline: Option<Instant>,
}

impl RefinementTermination {
    pub fn new(max_iterations: usize, relative_tolerance: f64) -> Self {
        Self {
            max_iterations,
            relative_tolerance,
            deadline: None,
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.deadline = Some(Instant::now() + limit);
        self
    }

    pub fn from_settings(settings: &CorrespondenceSettings) -> Self {
        let criterion = Self::new(settings.max_iterations, settings.relative_tolerance);
        match settings.time_limit {
            Some(limit) => criterion.with_time_limit(limit),
            None => criterion,
        }
    }
}

impl TerminationCriterion for RefinementTermination {
    fn check(&mut self, state: &RefinementState) -> Option<Termination> {
        if state.changed_rows == 0 {
            return Some(Termination::Converged);
        }
        let improvement = state.previous_distance - state.distance;
        if improvement <= self.relative_tolerance * state.previous_distance {
            return Some(Termination::Converged);
        }
        if state.iteration >= self.max_iterations {
            return Some(Termination::IterationCap);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(Termination::TimeLimit);
        }
        None
    }
}
