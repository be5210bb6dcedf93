//! Configuration types for correspondence and Procrustes pipelines.
//!
//! Every struct has working defaults and can be loaded from a JSON file with
//! [`load_settings`]; fields missing from the file keep their default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Whether a rotation fit may return an improper (reflecting) matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Reflection {
    /// Apply the determinant correction so the fit is always a proper rotation.
    #[default]
    Forbid,
    /// Return `U Vᵀ` as is, which may have determinant −1.
    Allow,
}

impl Reflection {
    pub fn from_mirror(mirror: bool) -> Self {
        if mirror {
            Reflection::Allow
        } else {
            Reflection::Forbid
        }
    }
}

/// How assignments restricted to a sparse candidate pattern are solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LpStrategy {
    /// Hungarian solve that only walks allowed edges. Always a valid permutation.
    #[default]
    Exact,
    /// LP relaxation solved by simplex, rounded at `round_threshold`.
    Simplex,
}

/// Settings for the dense simplex used by [`LpStrategy::Simplex`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexSettings {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// LP values below this are treated as zero when rounding to a permutation.
    pub round_threshold: f64,
}

impl Default for SimplexSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50_000,
            tolerance: 1e-9,
            round_threshold: 0.1,
        }
    }
}

/// Options of the pairwise correspondence engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrespondenceSettings {
    /// Also try the four reflective PCA candidates.
    pub mirror: bool,
    /// Propagate pairwise alignments along the minimum spanning tree.
    pub globalize: bool,
    /// Iteration cap of the local refinement loop.
    pub max_iterations: usize,
    /// Stop when `prev - d < relative_tolerance * prev`.
    pub relative_tolerance: f64,
    /// `gamma = gating_factor * l2-infinity(residual)`.
    pub gating_factor: f64,
    pub lp_strategy: LpStrategy,
    pub simplex: SimplexSettings,
    /// Normalise each set to unit centroid size before matching.
    pub scale: bool,
    /// Shape every global alignment is expressed against.
    pub base_index: usize,
    /// Wall-clock bound for a single refinement run.
    pub time_limit: Option<Duration>,
}

impl Default for CorrespondenceSettings {
    fn default() -> Self {
        Self {
            mirror: false,
            globalize: true,
            max_iterations: 1000,
            relative_tolerance: 1e-5,
            gating_factor: 1.5,
            lp_strategy: LpStrategy::Exact,
            simplex: SimplexSettings::default(),
            scale: false,
            base_index: 0,
            time_limit: None,
        }
    }
}

impl CorrespondenceSettings {
    pub fn reflection(&self) -> Reflection {
        Reflection::from_mirror(self.mirror)
    }
}

/// Options of the generalized Procrustes iterator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpaSettings {
    /// Normalise every configuration to unit centroid size.
    pub use_scaling: bool,
    pub max_iterations: usize,
    /// Absolute Frobenius change of the mean shape below which GPA stops.
    pub tolerance: f64,
    pub reflection: Reflection,
}

impl Default for GpaSettings {
    fn default() -> Self {
        Self {
            use_scaling: true,
            max_iterations: 5,
            tolerance: 1e-4,
            reflection: Reflection::Forbid,
        }
    }
}

/// Top-level settings file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub correspondence: CorrespondenceSettings,
    pub gpa: GpaSettings,
}

/// Read settings from a JSON file. Missing fields keep their defaults.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    parse_settings(&contents)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}

fn parse_settings(contents: &str) -> std::result::Result<Settings, serde_json::Error> {
    serde_json::from_str(contents)
}
