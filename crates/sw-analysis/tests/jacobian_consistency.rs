//! Analytic Jacobians must agree with numerical differentiation of the derivative.

use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use sw_analysis::{
    AnalysisResult, Stability, central_difference_jacobian, linearize, max_relative_error,
};
use sw_core::Tolerances;
use sw_model::{CoupledSwingModel, StateLayout, SwingModel};

const EPS: f64 = 1e-6;
const TOL: f64 = 1e-6;

fn four_machines(layout: StateLayout) -> CoupledSwingModel {
    let k = DMatrix::from_row_slice(
        4,
        4,
        &[
            0.0, 5.0, 0.0, 2.0, //
            5.0, 0.0, 3.0, 0.0, //
            0.0, 3.0, 0.0, 4.0, //
            2.0, 0.0, 4.0, 0.0,
        ],
    );
    CoupledSwingModel::new(
        vec![0.4, 0.8, 1.2, 0.6],
        vec![1.0, 0.5, 2.0, 0.1],
        vec![1.0, -0.5, 0.25, -0.75],
        k,
    )
    .unwrap()
    .with_layout(layout)
}

#[test]
fn smib_jacobian_matches_finite_differences() {
    let model = SwingModel::new(0.4, 20.0, 5.0, 400.0).unwrap();
    for (phi, omega) in [(0.0, 0.0), (0.3, -2.0), (-2.5, 7.0), (1.4, 0.1)] {
        let x = DVector::from_vec(vec![phi, omega]);
        let analytic = model.jacobian(&x, 0.0).unwrap();
        let numeric = central_difference_jacobian(
            &x,
            |s| -> AnalysisResult<DVector<f64>> { Ok(model.derivative(0.0, s)?) },
            EPS,
        )
        .unwrap();
        let err = max_relative_error(&analytic, &numeric, 1.0);
        assert!(err < TOL, "SMIB jacobian mismatch at ({phi}, {omega}): {err}");
    }
}

#[test]
fn coupled_jacobian_matches_finite_differences() {
    for layout in [StateLayout::Blocked, StateLayout::Interleaved] {
        let model = four_machines(layout);
        let x = model
            .state_from(&[0.1, -0.7, 1.3, 2.9], &[0.5, -0.25, 0.0, 1.5])
            .unwrap();
        let analytic = model.jacobian(&x, 0.0).unwrap();
        let numeric = central_difference_jacobian(
            &x,
            |s| -> AnalysisResult<DVector<f64>> { Ok(model.evaluate(s)?) },
            EPS,
        )
        .unwrap();
        let err = max_relative_error(&analytic, &numeric, 1.0);
        assert!(err < TOL, "{layout:?} jacobian mismatch: {err}");
    }
}

#[test]
fn coupled_jacobian_tracks_applied_events() {
    let mut model = four_machines(StateLayout::Blocked)
        .with_events(vec![sw_model::Event::line_drop(1.0, 0, 1)])
        .unwrap();
    let x = model
        .state_from(&[0.2, -0.2, 0.4, 0.0], &[0.0; 4])
        .unwrap();

    model.derivative(1.0, &x).unwrap();
    let analytic = model.jacobian(&x, 1.0).unwrap();
    // Coupling 0-1 is gone from both omega rows.
    assert_eq!(analytic[(4, 1)], 0.0);
    assert_eq!(analytic[(5, 0)], 0.0);

    let numeric = central_difference_jacobian(
        &x,
        |s| -> AnalysisResult<DVector<f64>> { Ok(model.evaluate(s)?) },
        EPS,
    )
    .unwrap();
    assert!(max_relative_error(&analytic, &numeric, 1.0) < TOL);
}

#[test]
fn coupled_network_has_rotational_zero_mode() {
    let model = four_machines(StateLayout::Blocked);
    let x = model.state_from(&[0.0; 4], &[0.0; 4]).unwrap();
    let tol = Tolerances {
        abs: 1e-8,
        rel: 1e-8,
    };
    let lin = linearize(&model, &x, 0.0, tol).unwrap();

    assert_eq!(lin.report.eigenvalues.len(), 8);
    assert_eq!(lin.report.stability, Stability::Marginal);
    assert!(lin.report.max_real_part.abs() < 1e-8);
}

#[test]
fn smib_at_equilibrium_is_stable() {
    let model = SwingModel::new(0.4, 20.0, 5.0, 400.0).unwrap();
    let (phi, omega) = model.equilibrium().unwrap();
    let x = DVector::from_vec(vec![phi, omega]);
    let lin = linearize(&model, &x, 0.0, Tolerances::default()).unwrap();
    assert_eq!(lin.report.stability, Stability::Stable);
}

#[test]
fn smib_with_negative_coupling_is_stable_at_equilibrium() {
    let model = SwingModel::new(1.0, 0.5, 0.5, -1.0).unwrap();
    let (phi, omega) = model.equilibrium().unwrap();
    let x = DVector::from_vec(vec![phi, omega]);
    let lin = linearize(&model, &x, 0.0, Tolerances::default()).unwrap();
    assert_eq!(lin.report.stability, Stability::Stable);
    assert!(lin.report.max_real_part < 0.0);
}

proptest! {
    #[test]
    fn coupled_jacobian_matches_at_random_states(
        phis in prop::collection::vec(-std::f64::consts::PI..std::f64::consts::PI, 4),
        omegas in prop::collection::vec(-5.0_f64..5.0, 4),
        interleaved in any::<bool>(),
    ) {
        let layout = if interleaved { StateLayout::Interleaved } else { StateLayout::Blocked };
        let model = four_machines(layout);
        let x = model.state_from(&phis, &omegas).unwrap();
        let analytic = model.jacobian(&x, 0.0).unwrap();
        let numeric = central_difference_jacobian(
            &x,
            |s| -> AnalysisResult<DVector<f64>> { Ok(model.evaluate(s)?) },
            EPS,
        )
        .unwrap();
        prop_assert!(max_relative_error(&analytic, &numeric, 1.0) < TOL);
    }
}
