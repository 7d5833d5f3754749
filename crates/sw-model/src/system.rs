//! SwingSystem trait: the boundary between models and external integrators.

use crate::error::ModelResult;
use nalgebra::{DMatrix, DVector};

/// Trait for swing-equation systems driven by an external ODE integrator.
///
/// A SwingSystem must implement:
/// - State dimension (length of the flat state vector)
/// - RHS (right-hand side) computation: x_dot = f(t, x)
/// - Jacobian of the RHS with respect to x, for implicit solvers and
///   linear stability analysis
pub trait SwingSystem {
    /// Length of the state vector.
    fn dim(&self) -> usize;

    /// Compute state derivative dxdt = f(t, x).
    ///
    /// Takes &mut self because scheduled events are applied before the
    /// field is evaluated. Calling it twice at the same `t` is safe: events
    /// fire at most once.
    fn rhs(&mut self, t: f64, x: &DVector<f64>) -> ModelResult<DVector<f64>>;

    /// Jacobian df/dx at `x`, using the parameters currently in effect.
    fn jacobian(&self, x: &DVector<f64>, t: f64) -> ModelResult<DMatrix<f64>>;
}

/// Check that a state vector has the expected length.
pub(crate) fn check_state_len(x: &DVector<f64>, expected: usize) -> ModelResult<()> {
    if x.len() != expected {
        return Err(crate::error::ModelError::LengthMismatch {
            what: "state",
            expected,
            actual: x.len(),
        });
    }
    Ok(())
}
