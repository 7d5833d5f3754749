//! N-machine coupled swing model with scheduled events.

use crate::error::{ModelError, ModelResult};
use crate::events::{AppliedEvent, Event, EventKind, EventObserver, EventSchedule};
use crate::layout::StateLayout;
use crate::system::{SwingSystem, check_state_len};
use nalgebra::{DMatrix, DVector};
use std::fmt;
use sw_core::{SwError, ensure_all_finite, ensure_non_negative, ensure_positive};

/// N generators coupled through a line susceptance matrix.
///
/// For each machine `j`:
///
/// ```text
/// dphi_j/dt   = omega_j
/// domega_j/dt = (P_j - D_j*omega_j + sum_i K[i,j] * sin(phi_i - phi_j)) / M_j
/// ```
///
/// With a symmetric `K` the interaction on `j` is the power flowing into it
/// over every line; equal phases carry no power.
///
/// Parameters change only through the event schedule. Every call to
/// [`CoupledSwingModel::derivative`] first applies the events due at `t`, so
/// the vector field depends on time and on the order of calls.
pub struct CoupledSwingModel {
    inertias: DVector<f64>,
    dampings: DVector<f64>,
    powers: DVector<f64>,
    coupling: DMatrix<f64>,
    layout: StateLayout,
    schedule: EventSchedule,
    applied: Vec<AppliedEvent>,
    observer: Option<Box<dyn EventObserver>>,
}

impl CoupledSwingModel {
    /// Create a model without events.
    ///
    /// # Errors
    /// Returns error if the parameter lengths differ, the coupling matrix is
    /// not `n x n`, its diagonal is non-zero, an inertia is not positive or a
    /// damping is negative.
    pub fn new(
        inertias: Vec<f64>,
        dampings: Vec<f64>,
        powers: Vec<f64>,
        coupling: DMatrix<f64>,
    ) -> ModelResult<Self> {
        let inertias = DVector::from_vec(inertias);
        let dampings = DVector::from_vec(dampings);
        let powers = DVector::from_vec(powers);
        let n = inertias.len();
        if n == 0 {
            return Err(SwError::InvalidArg {
                what: "model needs at least one machine",
            }
            .into());
        }
        validate_parameters(
            n,
            Some(&inertias),
            Some(&dampings),
            Some(&powers),
            Some(&coupling),
        )?;

        tracing::debug!(machines = n, "coupled swing model initialized");

        Ok(Self {
            inertias,
            dampings,
            powers,
            coupling,
            layout: StateLayout::default(),
            schedule: EventSchedule::default(),
            applied: Vec::new(),
            observer: None,
        })
    }

    /// Attach the event schedule, validating every payload against `n`.
    pub fn with_events(mut self, schedule: impl Into<EventSchedule>) -> ModelResult<Self> {
        let schedule = schedule.into();
        schedule.validate(self.n())?;
        self.schedule = schedule;
        Ok(self)
    }

    pub fn with_layout(mut self, layout: StateLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Notify `observer` whenever an event is applied.
    pub fn with_observer(mut self, observer: impl EventObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Number of machines.
    pub fn n(&self) -> usize {
        self.inertias.len()
    }

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    pub fn inertias(&self) -> &DVector<f64> {
        &self.inertias
    }

    pub fn dampings(&self) -> &DVector<f64> {
        &self.dampings
    }

    pub fn powers(&self) -> &DVector<f64> {
        &self.powers
    }

    pub fn coupling(&self) -> &DMatrix<f64> {
        &self.coupling
    }

    pub fn pending_events(&self) -> &EventSchedule {
        &self.schedule
    }

    /// Events applied so far, in application order.
    pub fn applied_events(&self) -> &[AppliedEvent] {
        &self.applied
    }

    /// Split a state vector into `(phis, omegas)` according to the layout.
    pub fn split_state(&self, state: &DVector<f64>) -> ModelResult<(DVector<f64>, DVector<f64>)> {
        check_state_len(state, 2 * self.n())?;
        Ok(self.layout.split(state, self.n()))
    }

    /// Build a state vector in this model's layout.
    pub fn state_from(&self, phis: &[f64], omegas: &[f64]) -> ModelResult<DVector<f64>> {
        for (what, values) in [("phases", phis), ("frequencies", omegas)] {
            if values.len() != self.n() {
                return Err(ModelError::LengthMismatch {
                    what,
                    expected: self.n(),
                    actual: values.len(),
                });
            }
        }
        Ok(self.layout.assemble(phis, omegas))
    }

    /// Apply every pending event with `time <= t`, in schedule order.
    ///
    /// Returns the number of events applied. Applied events are removed, so
    /// repeated calls never apply an event twice, and a later call with an
    /// earlier `t` does not undo anything.
    pub fn apply_due_events(&mut self, t: f64) -> usize {
        let mut count = 0;
        while let Some(event) = self.schedule.pop_due(t) {
            self.apply(&event);
            tracing::info!(
                kind = event.kind.label(),
                scheduled = event.time,
                t,
                "applied event"
            );
            let record = AppliedEvent {
                event,
                applied_at: t,
            };
            if let Some(observer) = self.observer.as_mut() {
                observer.on_event(&record);
            }
            self.applied.push(record);
            count += 1;
        }
        count
    }

    // Payloads were validated against n when the schedule was attached.
    fn apply(&mut self, event: &Event) {
        match &event.kind {
            EventKind::LoadJump { delta } => {
                self.powers += delta;
            }
            EventKind::LineDrop { from, to } => {
                self.coupling[(*from, *to)] = 0.0;
                self.coupling[(*to, *from)] = 0.0;
            }
            EventKind::Replace(replacement) => {
                if let Some(inertias) = &replacement.inertias {
                    self.inertias.copy_from(inertias);
                }
                if let Some(dampings) = &replacement.dampings {
                    self.dampings.copy_from(dampings);
                }
                if let Some(powers) = &replacement.powers {
                    self.powers.copy_from(powers);
                }
                if let Some(coupling) = &replacement.coupling {
                    self.coupling.copy_from(coupling);
                }
            }
        }
    }

    /// Net interaction power on each machine: `sum_i K[i,j] * sin(phi_i - phi_j)`.
    pub fn interaction_power(&self, state: &DVector<f64>) -> ModelResult<DVector<f64>> {
        let (phis, _) = self.split_state(state)?;
        Ok(self.interactions(&phis))
    }

    fn interactions(&self, phis: &DVector<f64>) -> DVector<f64> {
        let n = self.n();
        DVector::from_fn(n, |j, _| {
            (0..n)
                .map(|i| self.coupling[(i, j)] * (phis[i] - phis[j]).sin())
                .sum()
        })
    }

    /// Vector field at the current parameters. Does not touch the schedule.
    pub fn evaluate(&self, state: &DVector<f64>) -> ModelResult<DVector<f64>> {
        let n = self.n();
        let (phis, omegas) = self.split_state(state)?;
        let interactions = self.interactions(&phis);

        let mut dstate = DVector::zeros(2 * n);
        for j in 0..n {
            dstate[self.layout.phi_index(j, n)] = omegas[j];
            dstate[self.layout.omega_index(j, n)] =
                (self.powers[j] - self.dampings[j] * omegas[j] + interactions[j]) / self.inertias[j];
        }
        Ok(dstate)
    }

    /// Derivative at `(t, state)`: applies due events, then evaluates.
    pub fn derivative(&mut self, t: f64, state: &DVector<f64>) -> ModelResult<DVector<f64>> {
        check_state_len(state, 2 * self.n())?;
        self.apply_due_events(t);
        self.evaluate(state)
    }

    /// Jacobian of [`CoupledSwingModel::evaluate`] at `state`.
    ///
    /// Uses the parameters currently in effect; events are not applied.
    pub fn jacobian(&self, state: &DVector<f64>, _t: f64) -> ModelResult<DMatrix<f64>> {
        let n = self.n();
        let (phis, _) = self.split_state(state)?;
        let layout = self.layout;

        let mut jac = DMatrix::zeros(2 * n, 2 * n);
        for j in 0..n {
            let row_phi = layout.phi_index(j, n);
            let row_omega = layout.omega_index(j, n);
            let m = self.inertias[j];

            jac[(row_phi, layout.omega_index(j, n))] = 1.0;

            let mut self_term = 0.0;
            for i in (0..n).filter(|&i| i != j) {
                let sensitivity = self.coupling[(i, j)] * (phis[i] - phis[j]).cos() / m;
                jac[(row_omega, layout.phi_index(i, n))] = sensitivity;
                self_term -= sensitivity;
            }
            jac[(row_omega, layout.phi_index(j, n))] = self_term;
            jac[(row_omega, row_omega)] = -self.dampings[j] / m;
        }
        Ok(jac)
    }
}

impl SwingSystem for CoupledSwingModel {
    fn dim(&self) -> usize {
        2 * self.n()
    }

    fn rhs(&mut self, t: f64, x: &DVector<f64>) -> ModelResult<DVector<f64>> {
        self.derivative(t, x)
    }

    fn jacobian(&self, x: &DVector<f64>, t: f64) -> ModelResult<DMatrix<f64>> {
        CoupledSwingModel::jacobian(self, x, t)
    }
}

impl fmt::Debug for CoupledSwingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoupledSwingModel")
            .field("inertias", &self.inertias)
            .field("dampings", &self.dampings)
            .field("powers", &self.powers)
            .field("coupling", &self.coupling)
            .field("layout", &self.layout)
            .field("pending", &self.schedule.len())
            .field("applied", &self.applied.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Check whichever parameters are present against a model of `n` machines.
pub(crate) fn validate_parameters(
    n: usize,
    inertias: Option<&DVector<f64>>,
    dampings: Option<&DVector<f64>>,
    powers: Option<&DVector<f64>>,
    coupling: Option<&DMatrix<f64>>,
) -> ModelResult<()> {
    let check_len = |what: &'static str, v: &DVector<f64>| {
        if v.len() == n {
            Ok(())
        } else {
            Err(ModelError::LengthMismatch {
                what,
                expected: n,
                actual: v.len(),
            })
        }
    };

    if let Some(inertias) = inertias {
        check_len("inertias", inertias)?;
        for &m in inertias.iter() {
            ensure_positive(m, "inertias must be positive and finite")?;
        }
    }
    if let Some(dampings) = dampings {
        check_len("dampings", dampings)?;
        for &d in dampings.iter() {
            ensure_non_negative(d, "dampings must be non-negative and finite")?;
        }
    }
    if let Some(powers) = powers {
        check_len("powers", powers)?;
        ensure_all_finite(powers.as_slice(), "powers")?;
    }
    if let Some(coupling) = coupling {
        if coupling.nrows() != n || coupling.ncols() != n {
            return Err(ModelError::CouplingShape {
                n,
                rows: coupling.nrows(),
                cols: coupling.ncols(),
            });
        }
        ensure_all_finite(coupling.as_slice(), "coupling")?;
        if let Some(index) = (0..n).find(|&i| coupling[(i, i)] != 0.0) {
            return Err(ModelError::SelfCoupling {
                index,
                value: coupling[(index, index)],
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn three_machines() -> CoupledSwingModel {
        let k = DMatrix::from_row_slice(3, 3, &[0.0, 2.0, 7.0, 2.0, 0.0, 1.0, 7.0, 1.0, 0.0]);
        CoupledSwingModel::new(vec![1.0, 2.0, 0.5], vec![0.1, 0.2, 0.3], vec![1.0, -0.5, -0.5], k)
            .unwrap()
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = CoupledSwingModel::new(
            vec![1.0, 1.0],
            vec![0.1],
            vec![0.0, 0.0],
            DMatrix::zeros(2, 2),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::LengthMismatch {
                what: "dampings",
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn rejects_coupling_shape() {
        let err = CoupledSwingModel::new(
            vec![1.0, 1.0],
            vec![0.1, 0.1],
            vec![0.0, 0.0],
            DMatrix::zeros(3, 2),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::CouplingShape {
                n: 2,
                rows: 3,
                cols: 2
            }
        );
    }

    #[test]
    fn rejects_self_coupling() {
        let k = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.5]);
        let err = CoupledSwingModel::new(vec![1.0, 1.0], vec![0.1, 0.1], vec![0.0, 0.0], k)
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::SelfCoupling {
                index: 1,
                value: 0.5
            }
        );
    }

    #[test]
    fn rejects_zero_inertia() {
        let err = CoupledSwingModel::new(
            vec![1.0, 0.0],
            vec![0.1, 0.1],
            vec![0.0, 0.0],
            DMatrix::zeros(2, 2),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Parameter(_)));
    }

    #[test]
    fn rejects_empty_model() {
        assert!(CoupledSwingModel::new(vec![], vec![], vec![], DMatrix::zeros(0, 0)).is_err());
    }

    #[test]
    fn analytic_two_machine_interaction() {
        let k = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 2.0, 0.0]);
        let model =
            CoupledSwingModel::new(vec![1.0, 1.0], vec![0.0, 0.0], vec![0.0, 0.0], k).unwrap();
        let state = model
            .state_from(&[0.0, std::f64::consts::FRAC_PI_2], &[0.0, 0.0])
            .unwrap();

        // Power flows from the leading machine 1 into the lagging machine 0.
        let p = model.interaction_power(&state).unwrap();
        assert!((p[0] - 2.0).abs() < 1e-12);
        assert!((p[1] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn derivative_formula() {
        let mut model = three_machines();
        let state = model.state_from(&[0.1, -0.2, 0.3], &[1.0, 0.5, -0.5]).unwrap();
        let d = model.derivative(0.0, &state).unwrap();

        let phis: [f64; 3] = [0.1, -0.2, 0.3];
        let k = model.coupling().clone();
        let inter0: f64 = (0..3).map(|i| k[(i, 0)] * (phis[i] - phis[0]).sin()).sum();
        let expected = (1.0 - 0.1 * 1.0 + inter0) / 1.0;

        assert_eq!(d[0], 1.0);
        assert_eq!(d[2], -0.5);
        assert!((d[3] - expected).abs() < 1e-12);
    }

    #[test]
    fn jacobian_block_structure() {
        let model = three_machines();
        let state = model.state_from(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]).unwrap();
        let j = model.jacobian(&state, 0.0).unwrap();

        // phi rows
        assert_eq!(j[(0, 3)], 1.0);
        assert_eq!(j[(0, 0)], 0.0);
        // omega_0 row: K[1,0]/M_0, K[2,0]/M_0, minus their sum on the diagonal
        assert!((j[(3, 1)] - 2.0).abs() < 1e-12);
        assert!((j[(3, 2)] - 7.0).abs() < 1e-12);
        assert!((j[(3, 0)] + 9.0).abs() < 1e-12);
        assert!((j[(3, 3)] + 0.1).abs() < 1e-12);
        // omega_1 row divides by M_1 = 2
        assert!((j[(4, 0)] - 1.0).abs() < 1e-12);
        assert!((j[(4, 4)] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn line_drop_zeroes_both_entries() {
        let mut model = three_machines()
            .with_events(vec![Event::line_drop(1.0, 0, 2)])
            .unwrap();
        let before = model.coupling().clone();

        assert_eq!(model.apply_due_events(1.0), 1);

        let after = model.coupling();
        assert_eq!(after[(0, 2)], 0.0);
        assert_eq!(after[(2, 0)], 0.0);
        for r in 0..3 {
            for c in 0..3 {
                if (r, c) != (0, 2) && (r, c) != (2, 0) {
                    assert_eq!(after[(r, c)], before[(r, c)]);
                }
            }
        }
    }

    #[test]
    fn replacement_overwrites_selected_parameters() {
        let replacement = crate::events::ParameterReplacement {
            dampings: Some(DVector::from_vec(vec![1.0, 1.0, 1.0])),
            coupling: Some(DMatrix::zeros(3, 3)),
            ..Default::default()
        };
        let mut model = three_machines()
            .with_events(vec![Event::replace(2.0, replacement)])
            .unwrap();

        model.apply_due_events(2.5);

        assert_eq!(model.dampings().as_slice(), &[1.0, 1.0, 1.0]);
        assert_eq!(model.coupling(), &DMatrix::<f64>::zeros(3, 3));
        assert_eq!(model.inertias().as_slice(), &[1.0, 2.0, 0.5]);
    }

    #[test]
    fn all_due_events_fire_in_one_call() {
        let mut model = three_machines()
            .with_events(vec![
                Event::load_jump(1.0, vec![1.0, 0.0, 0.0]),
                Event::load_jump(2.0, vec![0.0, 1.0, 0.0]),
                Event::line_drop(3.0, 0, 1),
            ])
            .unwrap();

        assert_eq!(model.apply_due_events(2.0), 2);
        assert_eq!(model.powers().as_slice(), &[2.0, 0.5, -0.5]);
        assert_eq!(model.pending_events().len(), 1);
        assert_eq!(model.applied_events().len(), 2);
        assert_eq!(model.applied_events()[1].applied_at, 2.0);
    }

    #[test]
    fn observer_sees_applied_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut model = three_machines()
            .with_events(vec![Event::line_drop(0.5, 1, 2)])
            .unwrap()
            .with_observer(move |applied: &AppliedEvent| {
                sink.lock().unwrap().push(applied.event.kind.label());
            });

        let state = model.state_from(&[0.0; 3], &[0.0; 3]).unwrap();
        model.derivative(1.0, &state).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["line_drop"]);
    }

    #[test]
    fn interleaved_layout_permutes_output() {
        let blocked = three_machines();
        let interleaved = three_machines().with_layout(StateLayout::Interleaved);
        let phis = [0.4, -0.1, 0.2];
        let omegas = [0.3, -0.2, 0.1];

        let db = blocked
            .evaluate(&blocked.state_from(&phis, &omegas).unwrap())
            .unwrap();
        let di = interleaved
            .evaluate(&interleaved.state_from(&phis, &omegas).unwrap())
            .unwrap();

        for j in 0..3 {
            assert_eq!(db[j], di[2 * j]);
            assert_eq!(db[3 + j], di[2 * j + 1]);
        }
    }
}
