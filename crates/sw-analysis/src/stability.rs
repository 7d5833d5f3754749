//! Small-signal stability from eigenvalues of the linearized system.
//!
//! For the SMIB system the state matrix at the operating point `phi = 0` is
//!
//! ```text
//! A = [[0, 1], [-K/M, -D/M]]
//! ```
//!
//! with eigenvalues `-D/2M ± sqrt(D² - 4KM)/2M`. The pair is complex
//! (oscillatory) while `D² < 4KM` and real (overdamped) beyond it.

use crate::error::{AnalysisError, AnalysisResult};
use nalgebra::{Complex, DMatrix, DVector, Matrix2};
use sw_core::{Tolerances, ensure_finite, ensure_non_negative, ensure_positive, linspace};
use sw_model::{ModelError, SwingSystem};

/// Qualitative small-signal behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stability {
    /// Every eigenvalue has a negative real part.
    Stable,
    /// No eigenvalue grows, but at least one sits on the imaginary axis.
    ///
    /// Coupled models without an infinite bus always land here: shifting
    /// every phase by the same angle changes nothing, which is a zero
    /// eigenvalue.
    Marginal,
    /// Some eigenvalue has a positive real part.
    Unstable,
}

impl Stability {
    /// Classify a spectrum, treating `|re| <= tol.abs` as zero.
    pub fn classify(eigenvalues: &[Complex<f64>], tol: Tolerances) -> Self {
        let mut marginal = false;
        for lambda in eigenvalues {
            if lambda.re > tol.abs {
                return Stability::Unstable;
            }
            if lambda.re.abs() <= tol.abs {
                marginal = true;
            }
        }
        if marginal {
            Stability::Marginal
        } else {
            Stability::Stable
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StabilityReport {
    /// Sorted by descending real part.
    pub eigenvalues: Vec<Complex<f64>>,
    pub max_real_part: f64,
    pub stability: Stability,
}

/// Jacobian at an operating point together with its spectrum.
#[derive(Clone, Debug, PartialEq)]
pub struct Linearization {
    pub jacobian: DMatrix<f64>,
    pub report: StabilityReport,
}

/// One point of a damping sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DampingSweepPoint {
    pub damping: f64,
    pub eigenvalues: [Complex<f64>; 2],
}

impl DampingSweepPoint {
    /// True while the eigenvalue pair is complex.
    pub fn is_oscillatory(&self) -> bool {
        self.eigenvalues[0].im != 0.0
    }
}

fn check_smib(inertia: f64, damping: f64, coupling: f64) -> AnalysisResult<()> {
    ensure_positive(inertia, "inertia must be positive").map_err(ModelError::from)?;
    ensure_finite(damping, "damping").map_err(ModelError::from)?;
    ensure_finite(coupling, "coupling").map_err(ModelError::from)?;
    Ok(())
}

/// SMIB state matrix at `phi = 0`.
pub fn smib_state_matrix(inertia: f64, damping: f64, coupling: f64) -> AnalysisResult<Matrix2<f64>> {
    check_smib(inertia, damping, coupling)?;
    Ok(Matrix2::new(0.0, 1.0, -coupling / inertia, -damping / inertia))
}

/// Closed-form SMIB eigenvalues, ordered `[-, +]` by the square-root branch.
pub fn smib_eigenvalues(
    inertia: f64,
    damping: f64,
    coupling: f64,
) -> AnalysisResult<[Complex<f64>; 2]> {
    check_smib(inertia, damping, coupling)?;
    let two_m = 2.0 * inertia;
    let center = Complex::new(-damping / two_m, 0.0);
    let spread =
        Complex::new(damping * damping - 4.0 * coupling * inertia, 0.0).sqrt() / two_m;
    Ok([center - spread, center + spread])
}

/// Eigenvalues of the SMIB state matrix for `points` dampings in `[d_min, d_max]`.
pub fn damping_sweep(
    inertia: f64,
    coupling: f64,
    d_min: f64,
    d_max: f64,
    points: usize,
) -> AnalysisResult<Vec<DampingSweepPoint>> {
    check_smib(inertia, d_min, coupling)?;
    ensure_non_negative(d_min, "d_min must be non-negative").map_err(ModelError::from)?;
    ensure_finite(d_max, "d_max").map_err(ModelError::from)?;
    if d_max < d_min {
        return Err(AnalysisError::InvalidArg {
            what: "d_max must not be below d_min",
        });
    }
    if points < 2 {
        return Err(AnalysisError::InvalidArg {
            what: "sweep needs at least 2 points",
        });
    }

    linspace(d_min, d_max, points)
        .into_iter()
        .map(|damping| {
            Ok(DampingSweepPoint {
                damping,
                eigenvalues: smib_eigenvalues(inertia, damping, coupling)?,
            })
        })
        .collect()
}

/// Eigenvalues of a square matrix, sorted by descending real part.
pub fn eigenvalues(matrix: &DMatrix<f64>) -> AnalysisResult<Vec<Complex<f64>>> {
    let (rows, cols) = matrix.shape();
    if rows != cols {
        return Err(AnalysisError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Ok(Vec::new());
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite { what: "matrix" });
    }
    let mut eigs: Vec<Complex<f64>> = matrix.complex_eigenvalues().iter().copied().collect();
    eigs.sort_by(|a, b| b.re.total_cmp(&a.re).then(b.im.total_cmp(&a.im)));
    Ok(eigs)
}

pub fn stability_report(matrix: &DMatrix<f64>, tol: Tolerances) -> AnalysisResult<StabilityReport> {
    let eigenvalues = eigenvalues(matrix)?;
    if eigenvalues.iter().any(|l| !l.re.is_finite() || !l.im.is_finite()) {
        return Err(AnalysisError::NonFinite {
            what: "eigenvalues",
        });
    }
    let max_real_part = eigenvalues
        .iter()
        .map(|l| l.re)
        .fold(f64::NEG_INFINITY, f64::max);
    let stability = Stability::classify(&eigenvalues, tol);
    Ok(StabilityReport {
        eigenvalues,
        max_real_part,
        stability,
    })
}

/// Linearize `system` at `(state, t)` and classify the spectrum.
pub fn linearize<S>(
    system: &S,
    state: &DVector<f64>,
    t: f64,
    tol: Tolerances,
) -> AnalysisResult<Linearization>
where
    S: SwingSystem + ?Sized,
{
    if state.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite { what: "state" });
    }
    let jacobian = system.jacobian(state, t)?;
    if jacobian.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite { what: "jacobian" });
    }
    let report = stability_report(&jacobian, tol)?;
    tracing::debug!(
        dim = jacobian.nrows(),
        max_real_part = report.max_real_part,
        stability = ?report.stability,
        "linearized system"
    );
    Ok(Linearization { jacobian, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: f64 = 0.4;
    const D: f64 = 20.0;
    const K: f64 = 400.0;

    fn tol() -> Tolerances {
        Tolerances {
            abs: 1e-9,
            rel: 1e-9,
        }
    }

    #[test]
    fn closed_form_matches_numeric() {
        let a = smib_state_matrix(M, D, K).unwrap();
        let dyn_a = DMatrix::from_fn(2, 2, |r, c| a[(r, c)]);
        let numeric = eigenvalues(&dyn_a).unwrap();
        let closed = smib_eigenvalues(M, D, K).unwrap();

        // D² - 4KM = 400 - 640 < 0: complex pair with real part -D/2M = -25.
        for lambda in closed {
            assert!((lambda.re + 25.0).abs() < 1e-12);
            assert!(numeric.iter().any(|n| (n - lambda).norm() < 1e-8));
        }
    }

    #[test]
    fn sweep_crosses_critical_damping() {
        // Critical damping sqrt(4KM) = 25.3
        let sweep = damping_sweep(M, K, 0.0, 40.0, 200).unwrap();
        assert_eq!(sweep.len(), 200);
        assert!(sweep.first().unwrap().is_oscillatory());
        assert!(!sweep.last().unwrap().is_oscillatory());

        let critical = (4.0 * K * M).sqrt();
        for point in &sweep {
            assert_eq!(point.is_oscillatory(), point.damping < critical);
        }
    }

    #[test]
    fn sweep_rejects_bad_range() {
        assert!(damping_sweep(M, K, 10.0, 5.0, 10).is_err());
        assert!(damping_sweep(M, K, 0.0, 5.0, 1).is_err());
        assert!(damping_sweep(0.0, K, 0.0, 5.0, 10).is_err());
    }

    #[test]
    fn undamped_is_marginal() {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, -K / M, 0.0]);
        let report = stability_report(&a, tol()).unwrap();
        assert_eq!(report.stability, Stability::Marginal);
    }

    #[test]
    fn negative_stiffness_is_unstable() {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, K / M, -D / M]);
        let report = stability_report(&a, tol()).unwrap();
        assert_eq!(report.stability, Stability::Unstable);
        assert!(report.max_real_part > 0.0);
    }

    #[test]
    fn smib_rejects_zero_inertia() {
        assert!(matches!(
            smib_eigenvalues(0.0, D, K),
            Err(AnalysisError::Model(_))
        ));
        assert!(smib_state_matrix(0.0, D, K).is_err());
    }

    #[test]
    fn non_finite_matrix_is_rejected() {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, f64::NAN, -1.0]);
        assert_eq!(
            stability_report(&a, tol()).unwrap_err(),
            AnalysisError::NonFinite { what: "matrix" }
        );
    }

    #[test]
    fn non_finite_state_is_not_classified() {
        let model = sw_model::SwingModel::new(1.0, 0.5, 0.0, 1.0).unwrap();
        let x = DVector::from_vec(vec![f64::NAN, 0.0]);
        assert_eq!(
            linearize(&model, &x, 0.0, Tolerances::default()).unwrap_err(),
            AnalysisError::NonFinite { what: "state" }
        );
    }

    #[test]
    fn eigenvalues_reject_non_square() {
        let err = eigenvalues(&DMatrix::zeros(2, 3)).unwrap_err();
        assert_eq!(err, AnalysisError::NotSquare { rows: 2, cols: 3 });
    }
}
