//! Numerical Jacobians for checking analytic linearizations.

use crate::error::{AnalysisError, AnalysisResult};
use nalgebra::{DMatrix, DVector};

/// Central-difference Jacobian of `field` at `x`.
///
/// Column `j` is `(f(x + h e_j) - f(x - h e_j)) / 2h` with the step scaled to
/// the magnitude of `x[j]`: `h = epsilon * max(|x[j]|, 1)`.
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    field: F,
    epsilon: f64,
) -> AnalysisResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> AnalysisResult<DVector<f64>>,
{
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(AnalysisError::InvalidArg {
            what: "difference step must be positive",
        });
    }

    let rows = field(x)?.len();
    let mut jac = DMatrix::zeros(rows, x.len());
    let mut probe = x.clone();

    for (j, &xj) in x.iter().enumerate() {
        let h = epsilon * xj.abs().max(1.0);

        probe[j] = xj + h;
        let ahead = field(&probe)?;
        probe[j] = xj - h;
        let behind = field(&probe)?;
        probe[j] = xj;

        if ahead.len() != rows || behind.len() != rows {
            return Err(AnalysisError::FieldDimension {
                expected: rows,
                actual: ahead.len().max(behind.len()),
            });
        }
        jac.set_column(j, &((ahead - behind) / (2.0 * h)));
    }

    Ok(jac)
}

/// Largest entrywise relative error between two matrices.
///
/// Each difference is scaled by `max(|a|, |b|, floor)` so that entries near
/// zero are compared absolutely.
pub fn max_relative_error(a: &DMatrix<f64>, b: &DMatrix<f64>, floor: f64) -> f64 {
    debug_assert_eq!(a.shape(), b.shape());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs() / x.abs().max(y.abs()).max(floor))
        .fold(0.0, f64::max)
}
