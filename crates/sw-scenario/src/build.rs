//! Turning a validated scenario into a `CoupledSwingModel`.

use crate::ScenarioResult;
use crate::schema::{CouplingDef, EventActionDef, LayoutDef, Scenario};
use crate::validate::{ValidationError, validate_scenario};
use nalgebra::{DMatrix, DVector};
use std::path::Path;
use sw_model::{CoupledSwingModel, Event, EventKind, EventSchedule, ParameterReplacement, StateLayout};

impl From<LayoutDef> for StateLayout {
    fn from(layout: LayoutDef) -> Self {
        match layout {
            LayoutDef::Blocked => StateLayout::Blocked,
            LayoutDef::Interleaved => StateLayout::Interleaved,
        }
    }
}

/// Position of machine `id` in the scenario.
pub fn machine_index(scenario: &Scenario, id: &str) -> Result<usize, ValidationError> {
    scenario
        .machines
        .iter()
        .position(|m| m.id == id)
        .ok_or_else(|| ValidationError::MissingReference {
            id: id.to_string(),
            context: "machines".to_string(),
        })
}

fn matrix_from_rows(rows: &[Vec<f64>]) -> DMatrix<f64> {
    let n = rows.len();
    DMatrix::from_fn(n, rows.first().map_or(0, Vec::len), |r, c| rows[r][c])
}

/// Coupling matrix in machine order.
///
/// `base_dir` resolves relative CSV paths. The scenario is validated first.
pub fn coupling_matrix(scenario: &Scenario, base_dir: &Path) -> ScenarioResult<DMatrix<f64>> {
    validate_scenario(scenario)?;
    assemble_coupling(scenario, base_dir)
}

// Callers have validated the scenario, so matrix rows are square.
fn assemble_coupling(scenario: &Scenario, base_dir: &Path) -> ScenarioResult<DMatrix<f64>> {
    let n = scenario.machines.len();
    match &scenario.coupling {
        CouplingDef::Matrix { k } => Ok(matrix_from_rows(k)),
        CouplingDef::Lines { lines } => {
            let mut k = DMatrix::zeros(n, n);
            for line in lines {
                let a = machine_index(scenario, &line.from)?;
                let b = machine_index(scenario, &line.to)?;
                k[(a, b)] = line.k;
                k[(b, a)] = line.k;
            }
            Ok(k)
        }
        CouplingDef::GridCsv {
            vertices,
            links,
            default_k,
        } => {
            let topology = sw_grid::load_grid_csv(&base_dir.join(vertices), &base_dir.join(links))?;
            let order: Vec<&str> = scenario.machines.iter().map(|m| m.id.as_str()).collect();
            Ok(topology.coupling_matrix_for(&order, *default_k)?)
        }
    }
}

/// Decode the event definitions into a schedule, resolving machine ids.
pub fn event_schedule(scenario: &Scenario) -> ScenarioResult<EventSchedule> {
    validate_scenario(scenario)?;
    decode_events(scenario)
}

fn decode_events(scenario: &Scenario) -> ScenarioResult<EventSchedule> {
    let vector = |values: &Option<Vec<f64>>| values.as_ref().map(|v| DVector::from_vec(v.clone()));

    let mut events = Vec::with_capacity(scenario.events.len());
    for def in &scenario.events {
        let kind = match &def.action {
            EventActionDef::LoadJump { delta } => EventKind::LoadJump {
                delta: DVector::from_vec(delta.clone()),
            },
            EventActionDef::LineDrop { from, to } => EventKind::LineDrop {
                from: machine_index(scenario, from)?,
                to: machine_index(scenario, to)?,
            },
            EventActionDef::Replace {
                inertias,
                dampings,
                powers,
                k,
            } => EventKind::Replace(ParameterReplacement {
                inertias: vector(inertias),
                dampings: vector(dampings),
                powers: vector(powers),
                coupling: k.as_deref().map(matrix_from_rows),
            }),
        };
        events.push(Event::new(def.time, kind));
    }
    Ok(EventSchedule::new(events))
}

/// Build the model described by `scenario`.
pub fn build_model(scenario: &Scenario, base_dir: &Path) -> ScenarioResult<CoupledSwingModel> {
    validate_scenario(scenario)?;
    let inertias = scenario.machines.iter().map(|m| m.inertia).collect();
    let dampings = scenario.machines.iter().map(|m| m.damping).collect();
    let powers = scenario.machines.iter().map(|m| m.power).collect();
    let coupling = assemble_coupling(scenario, base_dir)?;

    let model = CoupledSwingModel::new(inertias, dampings, powers, coupling)?
        .with_layout(scenario.layout.into())
        .with_events(decode_events(scenario)?)?;

    tracing::info!(
        scenario = %scenario.name,
        machines = model.n(),
        events = model.pending_events().len(),
        "model built"
    );
    Ok(model)
}

/// Initial state in the scenario's layout; all zeros when unspecified.
pub fn initial_state(scenario: &Scenario) -> ScenarioResult<DVector<f64>> {
    validate_scenario(scenario)?;
    let layout = StateLayout::from(scenario.layout);
    Ok(match &scenario.initial_state {
        Some(initial) => layout.assemble(&initial.phi, &initial.omega),
        None => DVector::zeros(2 * scenario.machines.len()),
    })
}
