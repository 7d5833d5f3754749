//! Scenario validation logic.

use crate::LATEST_VERSION;
use crate::schema::{CouplingDef, EventActionDef, MachineDef, Scenario};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version == 0 || scenario.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if scenario.machines.is_empty() {
        return Err(invalid("machines", "[]", "at least one machine is required"));
    }

    let mut ids = HashSet::new();
    for machine in &scenario.machines {
        if !ids.insert(machine.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: machine.id.clone(),
                context: "machines".to_string(),
            });
        }
        validate_machine(machine)?;
    }

    let n = scenario.machines.len();
    let require_machine = |id: &str, context: &str| {
        if ids.contains(id) {
            Ok(())
        } else {
            Err(ValidationError::MissingReference {
                id: id.to_string(),
                context: context.to_string(),
            })
        }
    };

    match &scenario.coupling {
        CouplingDef::Matrix { k } => validate_matrix("coupling.k", k, n)?,
        CouplingDef::Lines { lines } => {
            for (i, line) in lines.iter().enumerate() {
                let context = format!("coupling.lines[{i}]");
                require_machine(&line.from, &context)?;
                require_machine(&line.to, &context)?;
                if line.from == line.to {
                    return Err(invalid(context, &line.from, "line connects a machine to itself"));
                }
                if !line.k.is_finite() {
                    return Err(invalid(format!("{context}.k"), line.k, "must be finite"));
                }
            }
        }
        CouplingDef::GridCsv { default_k, .. } => {
            if !default_k.is_finite() {
                return Err(invalid("coupling.default_k", default_k, "must be finite"));
            }
        }
    }

    for (i, event) in scenario.events.iter().enumerate() {
        let context = format!("events[{i}]");
        if !event.time.is_finite() {
            return Err(invalid(format!("{context}.time"), event.time, "must be finite"));
        }
        match &event.action {
            EventActionDef::LoadJump { delta } => {
                validate_vector(&format!("{context}.delta"), delta, n)?;
            }
            EventActionDef::LineDrop { from, to } => {
                require_machine(from, &context)?;
                require_machine(to, &context)?;
                if from == to {
                    return Err(invalid(context, from, "line connects a machine to itself"));
                }
            }
            EventActionDef::Replace {
                inertias,
                dampings,
                powers,
                k,
            } => {
                if inertias.is_none() && dampings.is_none() && powers.is_none() && k.is_none() {
                    return Err(invalid(context, "{}", "replacement sets no parameters"));
                }
                if let Some(values) = inertias {
                    validate_vector(&format!("{context}.inertias"), values, n)?;
                    if let Some(m) = values.iter().find(|m| **m <= 0.0) {
                        return Err(invalid(format!("{context}.inertias"), m, "must be positive"));
                    }
                }
                if let Some(values) = dampings {
                    validate_vector(&format!("{context}.dampings"), values, n)?;
                    if let Some(d) = values.iter().find(|d| **d < 0.0) {
                        return Err(invalid(format!("{context}.dampings"), d, "must be non-negative"));
                    }
                }
                if let Some(values) = powers {
                    validate_vector(&format!("{context}.powers"), values, n)?;
                }
                if let Some(k) = k {
                    validate_matrix(&format!("{context}.k"), k, n)?;
                }
            }
        }
    }

    if let Some(initial) = &scenario.initial_state {
        validate_vector("initial_state.phi", &initial.phi, n)?;
        validate_vector("initial_state.omega", &initial.omega, n)?;
    }

    Ok(())
}

fn validate_machine(machine: &MachineDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("machine '{}'.{name}", machine.id);
    if !(machine.inertia.is_finite() && machine.inertia > 0.0) {
        return Err(invalid(field("inertia"), machine.inertia, "must be positive"));
    }
    if !(machine.damping.is_finite() && machine.damping >= 0.0) {
        return Err(invalid(field("damping"), machine.damping, "must be non-negative"));
    }
    if !machine.power.is_finite() {
        return Err(invalid(field("power"), machine.power, "must be finite"));
    }
    Ok(())
}

fn validate_vector(field: &str, values: &[f64], n: usize) -> Result<(), ValidationError> {
    if values.len() != n {
        return Err(invalid(
            field,
            values.len(),
            &format!("expected {n} entries, one per machine"),
        ));
    }
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(invalid(field, v, "must be finite"));
    }
    Ok(())
}

fn validate_matrix(field: &str, rows: &[Vec<f64>], n: usize) -> Result<(), ValidationError> {
    if rows.len() != n || rows.iter().any(|row| row.len() != n) {
        return Err(invalid(field, format!("{} rows", rows.len()), &format!("expected {n}x{n}")));
    }
    for (i, row) in rows.iter().enumerate() {
        if let Some(v) = row.iter().find(|v| !v.is_finite()) {
            return Err(invalid(format!("{field}[{i}]"), v, "must be finite"));
        }
        if row[i] != 0.0 {
            return Err(invalid(format!("{field}[{i}][{i}]"), row[i], "diagonal must be zero"));
        }
    }
    let asymmetric = (0..n).any(|i| (0..i).any(|j| rows[i][j] != rows[j][i]));
    if asymmetric {
        tracing::warn!(field, "coupling matrix is not symmetric");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EventDef, LayoutDef, LineDef};

    fn base() -> Scenario {
        Scenario {
            version: 1,
            name: "two machines".to_string(),
            layout: LayoutDef::Blocked,
            machines: vec![
                MachineDef {
                    id: "g1".to_string(),
                    inertia: 1.0,
                    damping: 0.1,
                    power: 1.0,
                },
                MachineDef {
                    id: "g2".to_string(),
                    inertia: 1.0,
                    damping: 0.1,
                    power: -1.0,
                },
            ],
            coupling: CouplingDef::Lines {
                lines: vec![LineDef {
                    from: "g1".to_string(),
                    to: "g2".to_string(),
                    k: 4.0,
                }],
            },
            events: vec![],
            initial_state: None,
        }
    }

    #[test]
    fn base_is_valid() {
        validate_scenario(&base()).unwrap();
    }

    #[test]
    fn rejects_duplicate_machine() {
        let mut s = base();
        s.machines[1].id = "g1".to_string();
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn rejects_zero_inertia() {
        let mut s = base();
        s.machines[0].inertia = 0.0;
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_unknown_line_endpoint() {
        let mut s = base();
        s.events.push(EventDef {
            time: 1.0,
            action: EventActionDef::LineDrop {
                from: "g1".to_string(),
                to: "g9".to_string(),
            },
        });
        assert_eq!(
            validate_scenario(&s),
            Err(ValidationError::MissingReference {
                id: "g9".to_string(),
                context: "events[0]".to_string()
            })
        );
    }

    #[test]
    fn rejects_short_load_jump() {
        let mut s = base();
        s.events.push(EventDef {
            time: 1.0,
            action: EventActionDef::LoadJump { delta: vec![1.0] },
        });
        assert!(validate_scenario(&s).is_err());
    }

    #[test]
    fn rejects_matrix_with_diagonal() {
        let mut s = base();
        s.coupling = CouplingDef::Matrix {
            k: vec![vec![1.0, 2.0], vec![2.0, 0.0]],
        };
        assert!(validate_scenario(&s).is_err());
    }

    #[test]
    fn rejects_future_version() {
        let mut s = base();
        s.version = LATEST_VERSION + 1;
        assert_eq!(
            validate_scenario(&s),
            Err(ValidationError::UnsupportedVersion {
                version: LATEST_VERSION + 1
            })
        );
    }
}
