//! Error type shared by every computation in the crate.

use thiserror::Error;

/// Failures raised by alignment, assignment and Procrustes routines.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Two inputs that must agree in size do not.
    #[error("{context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Numerically degenerate configuration (zero size, NaN radius, failed SVD).
    #[error("degenerate input: {0}")]
    Degenerate(String),

    /// No perfect matching exists inside the candidate pattern.
    #[error("infeasible assignment: {0}")]
    Infeasible(String),

    /// Rounding an LP relaxation did not yield a permutation matrix.
    #[error("LP rounding produced an invalid permutation ({rows} valid rows, {cols} valid columns)")]
    InvalidPermutation { rows: usize, cols: usize },

    #[error("no convergence: {0}")]
    Convergence(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn mismatch(
        context: &'static str,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Error::ShapeMismatch {
            context,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
