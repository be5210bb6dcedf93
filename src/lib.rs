//! # morphalign - point-set correspondence and Procrustes analysis
//!
//! `morphalign` aligns populations of 3D shapes given as unordered point
//! sets. For every pair it finds a rotation and a point-to-point matching by
//! alternating Kabsch fits with restricted assignment solves, started from
//! every principal-axis seed. Pairwise results can be propagated along the
//! minimum spanning tree of pairwise distances so that every shape is
//! expressed in the frame of one base shape. Row-corresponded
//! configurations can then be analysed with generalized Procrustes analysis.
//!
//! ## Quick Start
//!
//! ```rust
//! use morphalign::{gpd, PointSet};
//!
//! let reference = PointSet::from_row_slice(3, 3, &[0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.3, 1.0, 0.0]);
//! // The same triangle turned 90 degrees about z, rows shuffled.
//! let moving = PointSet::from_row_slice(3, 3, &[-1.0, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
//!
//! let alignment = gpd(&reference, &moving, None).unwrap();
//! assert_eq!(alignment.permutation.as_slice(), &[2, 0, 1]);
//! assert!(alignment.distance < 1e-9);
//! ```
//!
//! ## Conventions
//!
//! - Points are rows; rotations act on the right (`points * R`).
//! - An [`Alignment`] of `moving` onto `reference` satisfies
//!   `moving[k] * rotation ≈ reference[permutation[k]]` after centring.
//! - Correspondence pair `(i, j)`, `i < j`, aligns shape `j` onto shape `i`.
//!
//! ## Extending the Library
//!
//! The refinement loop is written against two traits in [`core`]:
//!
//! - **[`AssignmentSolver`](core::AssignmentSolver)**: matching under a
//!   candidate pattern; [`LinearAssignment`](assignment::LinearAssignment)
//!   is the default
//! - **[`LinearProgramSolver`](core::LinearProgramSolver)**: LP backend for
//!   the relaxed sparse assignment
//!
//! ## Modules
//!
//! - **[`api`]**: High-level functions
//! - **[`assignment`]**: Hungarian, simplex and candidate patterns
//! - **[`correspondence`]**: Pairwise orchestrator and globalization
//! - **[`estimators`]**: Kabsch fit and principal-axis seeds
//! - **[`gpa`]**: Generalized Procrustes analysis and shape PCA
//! - **[`optimisers`]**: Local refinement and multi-start alignment
//! - **[`settings`]**: Configuration types and JSON loading

pub mod api;
pub mod assignment;
pub mod core;
pub mod correspondence;
pub mod error;
pub mod estimators;
pub mod gpa;
pub mod graph;
pub mod jobs;
pub mod models;
pub mod optimisers;
pub mod scoring;
pub mod settings;
pub mod shape;
pub mod subsample;
pub mod types;

#[cfg(feature = "python")]
pub mod python;

// Re-export high-level API
pub use api::{apply_alignment, correspondence, gpd, kabsch, locgpd, run_gpa, shape_pca};

pub use correspondence::{Correspondence, CorrespondenceResult, GlobalizedAlignment};
pub use error::{Error, Result};
pub use gpa::{Gpa, GpaResult, ShapePca};
pub use models::{Alignment, GlobalAlignment, Permutation};
pub use optimisers::{LocalRefinement, MultiStartAlignment};
pub use settings::{
    load_settings, CorrespondenceSettings, GpaSettings, LpStrategy, Reflection, Settings,
};
pub use types::{PointSet, Rotation};
