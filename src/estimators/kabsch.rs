//! Closed-form rotation fitting between corresponded point sets (Kabsch).
//!
//! Convention: with `Ā`, `B̄` the centred inputs and `H = Āᵀ B̄ = U S Vᵀ`, the fit
//! is `R = U Vᵀ`, the orthogonal matrix minimising `‖Ā R − B̄‖`. Rows of `A`
//! are carried onto rows of `B`, so `kabsch(A, A·R)` recovers `R`.

use nalgebra::{DMatrix, Matrix3, SVD};

use crate::error::{Error, Result};
use crate::settings::Reflection;
use crate::shape::{center, ensure_3d, ensure_same_shape};
use crate::types::{PointSet, Rotation};

/// Best-fit D×D orthogonal matrix carrying `source` onto `target`.
///
/// Works for any dimension; both sets must be N×D with matching rows.
/// With [`Reflection::Forbid`] the singular vector of the smallest singular
/// value is flipped whenever `U Vᵀ` would be improper.
pub fn fit_rotation(
    source: &PointSet,
    target: &PointSet,
    reflection: Reflection,
) -> Result<DMatrix<f64>> {
    ensure_same_shape("kabsch", source, target)?;
    if source.nrows() == 0 || source.ncols() == 0 {
        return Err(Error::InvalidInput("kabsch: empty point set".to_string()));
    }

    let h = center(source).transpose() * center(target);
    if h.iter().any(|x| !x.is_finite()) {
        return Err(Error::Degenerate(
            "kabsch: cross-covariance is not finite".to_string(),
        ));
    }

    let svd = SVD::new(h, true, true);
    let smallest = svd.singular_values.imin();
    let mut u = svd
        .u
        .ok_or_else(|| Error::Degenerate("kabsch: SVD did not return U".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| Error::Degenerate("kabsch: SVD did not return Vᵀ".to_string()))?;

    let r = &u * &v_t;
    if reflection == Reflection::Forbid && r.determinant() < 0.0 {
        u.column_mut(smallest).neg_mut();
        return Ok(u * v_t);
    }
    Ok(r)
}

/// 3D specialisation of [`fit_rotation`].
pub fn kabsch(source: &PointSet, target: &PointSet, reflection: Reflection) -> Result<Rotation> {
    ensure_3d("kabsch", source)?;
    ensure_same_shape("kabsch", source, target)?;
    let r = fit_rotation(source, target, reflection)?;
    Ok(Matrix3::from_column_slice(r.as_slice()))
}

/// `‖RᵀR − I‖_F`, zero for an exact orthogonal matrix.
pub fn orthogonality_error(rotation: &Rotation) -> f64 {
    (rotation.transpose() * rotation - Rotation::identity()).norm()
}
