//! Pairwise correspondence over a population of shapes, with optional
//! globalization along the minimum spanning tree of pairwise distances.
//!
//! Pair `(i, j)` with `i < j` aligns shape `j` onto shape `i`. Lookups with
//! `i > j` return the reversed alignment (transposed rotation, inverse
//! permutation), so callers can ask for either direction.

use std::collections::BTreeMap;

use log::{info, warn};
use nalgebra::DMatrix;

use crate::assignment::LinearAssignment;
use crate::core::AssignmentSolver;
use crate::error::{Error, Result};
use crate::graph::{minimum_spanning_tree, path_from_parents, SpanningTree};
use crate::jobs::Job;
use crate::models::{Alignment, GlobalAlignment, Permutation};
use crate::optimisers::{LocalRefinement, MultiStartAlignment};
use crate::settings::CorrespondenceSettings;
use crate::shape::{ensure_3d, ensure_same_shape};
use crate::types::{PointSet, Rotation};

/// Every shape expressed in the frame of `base`.
#[derive(Debug, Clone)]
pub struct GlobalizedAlignment {
    pub base: usize,
    pub tree: SpanningTree,
    /// Keyed by shape index; the base maps to the identity.
    pub alignments: BTreeMap<usize, GlobalAlignment>,
    /// Shapes cut off from the base because their alignments failed.
    pub unreachable: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct CorrespondenceResult {
    /// Symmetric; zero on the diagonal, infinite for failed pairs.
    pub distances: DMatrix<f64>,
    /// Rows per shape.
    pub points: usize,
    /// `rotations[i][j]` carries shape `j` onto shape `i`;
    /// `rotations[j][i] == rotations[i][j]ᵀ`.
    pub rotations: Vec<Vec<Rotation>>,
    /// Successful alignments keyed by `(i, j)`, `i < j`.
    pub alignments: BTreeMap<(usize, usize), Alignment>,
    pub failures: BTreeMap<(usize, usize), Error>,
    pub global: Option<GlobalizedAlignment>,
}

impl CorrespondenceResult {
    pub fn len(&self) -> usize {
        self.distances.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alignment carrying shape `j` onto shape `i`.
    pub fn alignment(&self, i: usize, j: usize) -> Option<Alignment> {
        if i < j {
            self.alignments.get(&(i, j)).cloned()
        } else if i > j {
            self.alignments.get(&(j, i)).map(Alignment::reversed)
        } else {
            None
        }
    }

    pub fn permutation(&self, i: usize, j: usize) -> Option<Permutation> {
        self.alignment(i, j).map(|a| a.permutation)
    }

    pub fn permutations(&self) -> BTreeMap<(usize, usize), Permutation> {
        self.alignments
            .iter()
            .map(|(&key, a)| (key, a.permutation.clone()))
            .collect()
    }

    /// `true` when every successful pair converged and no pair failed.
    pub fn did_converge(&self) -> bool {
        self.failures.is_empty() && self.alignments.values().all(|a| a.converged)
    }

    /// Pair rotations to seed a follow-up run, e.g. on denser point sets.
    pub fn rotation_seeds(&self) -> BTreeMap<(usize, usize), Rotation> {
        self.alignments
            .iter()
            .map(|(&key, a)| (key, a.rotation))
            .collect()
    }
}

struct PairTask<'a> {
    reference: &'a PointSet,
    moving: &'a PointSet,
    seed: Option<Rotation>,
}

/// Pairwise correspondence orchestrator.
///
/// Unseeded pairs use [`MultiStartAlignment`]; pairs with an initial rotation
/// run a single [`LocalRefinement`] from it. Pair computations are independent
/// and run through [`Job`].
#[derive(Debug, Clone)]
pub struct Correspondence<A = LinearAssignment> {
    aligner: MultiStartAlignment<A>,
}

impl Correspondence<LinearAssignment> {
    pub fn new(settings: CorrespondenceSettings) -> Self {
        Self {
            aligner: MultiStartAlignment::new(settings),
        }
    }
}

impl<A: AssignmentSolver + Sync> Correspondence<A> {
    pub fn with_refinement(local: LocalRefinement<A>) -> Self {
        Self {
            aligner: MultiStartAlignment::from_local(local),
        }
    }

    pub fn settings(&self) -> &CorrespondenceSettings {
        self.aligner.local().settings()
    }

    /// Align every pair of `shapes`.
    ///
    /// `initial` may hold seed rotations keyed by pair. A key `(j, i)` with
    /// `j > i` is read as a rotation carrying `i` onto `j` and transposed.
    pub fn run(
        &self,
        shapes: &[PointSet],
        initial: Option<&BTreeMap<(usize, usize), Rotation>>,
    ) -> Result<CorrespondenceResult> {
        let n = shapes.len();
        self.validate(shapes, initial)?;

        let mut tasks = BTreeMap::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let seed = initial.and_then(|seeds| {
                    seeds
                        .get(&(i, j))
                        .copied()
                        .or_else(|| seeds.get(&(j, i)).map(|r| r.transpose()))
                });
                tasks.insert(
                    (i, j),
                    PairTask {
                        reference: &shapes[i],
                        moving: &shapes[j],
                        seed,
                    },
                );
            }
        }

        let job = Job::new(tasks, &self.aligner, |task: &PairTask<'_>, aligner: &&MultiStartAlignment<A>| {
            match task.seed {
                Some(seed) => aligner.local().run(task.reference, task.moving, &seed),
                None => aligner.run(task.reference, task.moving),
            }
        });
        let outcomes = job.run();

        let mut distances = DMatrix::zeros(n, n);
        let mut rotations = vec![vec![Rotation::identity(); n]; n];
        let mut alignments = BTreeMap::new();
        let mut failures = BTreeMap::new();
        for ((i, j), outcome) in outcomes {
            match outcome {
                Ok(a) => {
                    distances[(i, j)] = a.distance;
                    distances[(j, i)] = a.distance;
                    rotations[i][j] = a.rotation;
                    rotations[j][i] = a.rotation.transpose();
                    alignments.insert((i, j), a);
                }
                Err(err) => {
                    warn!("correspondence: pair ({i}, {j}) failed: {err}");
                    distances[(i, j)] = f64::INFINITY;
                    distances[(j, i)] = f64::INFINITY;
                    failures.insert((i, j), err);
                }
            }
        }

        let mut result = CorrespondenceResult {
            distances,
            points: shapes[0].nrows(),
            rotations,
            alignments,
            failures,
            global: None,
        };
        if self.settings().globalize && n > 0 {
            result.global = Some(globalize(&result, self.settings().base_index)?);
        }

        info!(
            "correspondence: {} shapes, {} pairs aligned, {} failed",
            n,
            result.alignments.len(),
            result.failures.len()
        );
        Ok(result)
    }

    fn validate(
        &self,
        shapes: &[PointSet],
        initial: Option<&BTreeMap<(usize, usize), Rotation>>,
    ) -> Result<()> {
        let Some(first) = shapes.first() else {
            return Err(Error::InvalidInput("correspondence: no shapes".to_string()));
        };
        ensure_3d("correspondence shape", first)?;
        for shape in &shapes[1..] {
            ensure_same_shape("correspondence shape", first, shape)?;
        }
        let n = shapes.len();
        if self.settings().globalize && self.settings().base_index >= n {
            return Err(Error::InvalidInput(format!(
                "correspondence: base index {} out of range for {} shapes",
                self.settings().base_index,
                n
            )));
        }
        if let Some(seeds) = initial {
            if let Some(&(i, j)) = seeds.keys().find(|&&(i, j)| i == j || i >= n || j >= n) {
                return Err(Error::InvalidInput(format!(
                    "correspondence: initial rotation for invalid pair ({i}, {j})"
                )));
            }
        }
        Ok(())
    }
}

/// Compose pairwise alignments along the spanning tree from `base`.
pub fn globalize(result: &CorrespondenceResult, base: usize) -> Result<GlobalizedAlignment> {
    let n = result.len();
    if base >= n {
        return Err(Error::InvalidInput(format!(
            "globalize: base index {base} out of range for {n} shapes"
        )));
    }
    let tree = minimum_spanning_tree(&result.distances)?;
    let parents = tree.parents(base);

    let mut alignments = BTreeMap::new();
    let mut unreachable = Vec::new();
    for target in 0..n {
        let Some(path) = path_from_parents(&parents, base, target) else {
            unreachable.push(target);
            continue;
        };
        let mut global = GlobalAlignment::identity(result.points);
        for edge in path.windows(2) {
            let step = result.alignment(edge[0], edge[1]).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "globalize: tree edge ({}, {}) has no alignment",
                    edge[0], edge[1]
                ))
            })?;
            global = global.extend(&step.rotation, &step.permutation);
        }
        alignments.insert(target, global);
    }

    if !unreachable.is_empty() {
        warn!("globalize: shapes {unreachable:?} are not connected to base {base}");
    }
    Ok(GlobalizedAlignment {
        base,
        tree,
        alignments,
        unreachable,
    })
}
