//! Single machine infinite bus (SMIB) model.

use crate::error::ModelResult;
use crate::system::{SwingSystem, check_state_len};
use nalgebra::{DMatrix, DVector, Matrix2};
use sw_core::{ensure_finite, ensure_non_negative, ensure_positive};

/// One generator swinging against an infinite bus.
///
/// State is `[phi, omega]`:
///
/// ```text
/// dphi/dt   = omega
/// domega/dt = (P - D*omega - K*sin(phi)) / M
/// ```
///
/// where:
/// - M is the inertia (must be positive)
/// - D is the damping (non-negative)
/// - P is the power injection (negative for a consumer)
/// - K is the coupling to the infinite bus
///
/// The system is time-invariant and immutable after construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwingModel {
    inertia: f64,
    damping: f64,
    power: f64,
    coupling: f64,
}

impl SwingModel {
    /// Create a new SMIB model.
    ///
    /// # Errors
    /// Returns error if inertia is not positive, damping is negative, or any
    /// parameter is non-finite.
    pub fn new(inertia: f64, damping: f64, power: f64, coupling: f64) -> ModelResult<Self> {
        let inertia = ensure_positive(inertia, "inertia must be positive and finite")?;
        let damping = ensure_non_negative(damping, "damping must be non-negative and finite")?;
        let power = ensure_finite(power, "power")?;
        let coupling = ensure_finite(coupling, "coupling")?;

        tracing::debug!(inertia, damping, power, coupling, "SMIB model initialized");

        Ok(Self {
            inertia,
            damping,
            power,
            coupling,
        })
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn coupling(&self) -> f64 {
        self.coupling
    }

    /// Vector field at `(phi, omega)`, returned as `(dphi, domega)`.
    pub fn field(&self, phi: f64, omega: f64) -> (f64, f64) {
        let dphi = omega;
        let domega = (self.power - self.damping * omega - self.coupling * phi.sin()) / self.inertia;
        (dphi, domega)
    }

    /// Derivative of `state = [phi, omega]`. `t` is unused.
    pub fn derivative(&self, _t: f64, state: &DVector<f64>) -> ModelResult<DVector<f64>> {
        check_state_len(state, 2)?;
        let (dphi, domega) = self.field(state[0], state[1]);
        Ok(DVector::from_vec(vec![dphi, domega]))
    }

    /// Linearization at phase angle `phi`.
    pub fn jacobian_at(&self, phi: f64) -> Matrix2<f64> {
        Matrix2::new(
            0.0,
            1.0,
            -self.coupling * phi.cos() / self.inertia,
            -self.damping / self.inertia,
        )
    }

    /// Jacobian of [`SwingModel::derivative`] at `state`.
    pub fn jacobian(&self, state: &DVector<f64>, _t: f64) -> ModelResult<DMatrix<f64>> {
        check_state_len(state, 2)?;
        let j = self.jacobian_at(state[0]);
        Ok(DMatrix::from_fn(2, 2, |r, c| j[(r, c)]))
    }

    /// Stable operating point `(phi*, 0)` with `sin(phi*) = P/K`.
    ///
    /// Of the two angles with that sine, the one with `K*cos(phi*) > 0` is
    /// returned, so the synchronizing torque restores the angle. For
    /// negative coupling that is `pi - asin(P/K)`.
    ///
    /// Returns `None` when `|P| > |K|`: the bus cannot absorb the injection
    /// and no fixed point exists.
    pub fn equilibrium(&self) -> Option<(f64, f64)> {
        if self.coupling == 0.0 {
            return (self.power == 0.0).then_some((0.0, 0.0));
        }
        let ratio = self.power / self.coupling;
        if ratio.abs() > 1.0 {
            return None;
        }
        let phi = if self.coupling > 0.0 {
            ratio.asin()
        } else {
            std::f64::consts::PI - ratio.asin()
        };
        Some((phi, 0.0))
    }
}

impl SwingSystem for SwingModel {
    fn dim(&self) -> usize {
        2
    }

    fn rhs(&mut self, t: f64, x: &DVector<f64>) -> ModelResult<DVector<f64>> {
        self.derivative(t, x)
    }

    fn jacobian(&self, x: &DVector<f64>, t: f64) -> ModelResult<DMatrix<f64>> {
        SwingModel::jacobian(self, x, t)
    }
}
