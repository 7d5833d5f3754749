//! Ordering of phase angles and frequencies in the flat state vector.

use nalgebra::DVector;

/// How the `2n` entries of a coupled state vector are arranged.
///
/// Derivative and Jacobian always use the same layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StateLayout {
    /// `[phi_0, .., phi_{n-1}, omega_0, .., omega_{n-1}]`
    #[default]
    Blocked,
    /// `[phi_0, omega_0, phi_1, omega_1, ..]`
    Interleaved,
}

impl StateLayout {
    /// Position of machine `machine`'s phase angle.
    #[inline]
    pub fn phi_index(self, machine: usize, _n: usize) -> usize {
        match self {
            StateLayout::Blocked => machine,
            StateLayout::Interleaved => 2 * machine,
        }
    }

    /// Position of machine `machine`'s angular frequency.
    #[inline]
    pub fn omega_index(self, machine: usize, n: usize) -> usize {
        match self {
            StateLayout::Blocked => n + machine,
            StateLayout::Interleaved => 2 * machine + 1,
        }
    }

    /// Split a state vector into `(phis, omegas)`.
    ///
    /// The caller guarantees `state.len() == 2 * n`.
    pub fn split(self, state: &DVector<f64>, n: usize) -> (DVector<f64>, DVector<f64>) {
        let phis = DVector::from_fn(n, |j, _| state[self.phi_index(j, n)]);
        let omegas = DVector::from_fn(n, |j, _| state[self.omega_index(j, n)]);
        (phis, omegas)
    }

    /// Assemble a state vector from phases and frequencies of equal length.
    pub fn assemble(self, phis: &[f64], omegas: &[f64]) -> DVector<f64> {
        let n = phis.len();
        debug_assert_eq!(n, omegas.len());
        let mut state = DVector::zeros(2 * n);
        for j in 0..n {
            state[self.phi_index(j, n)] = phis[j];
            state[self.omega_index(j, n)] = omegas[j];
        }
        state
    }
}
