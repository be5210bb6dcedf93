//! Closed-form estimators used by the correspondence engine.
//!
//! - [`kabsch`]: optimal rotation between corresponded point sets
//! - [`pca`]: principal-axis candidate rotations for multi-start alignment

pub mod kabsch;
pub mod pca;

pub use kabsch::{fit_rotation, kabsch, orthogonality_error};
pub use pca::{principal_axes, principal_component_seeds};
