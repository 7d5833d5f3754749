mod error;

use clap::{Parser, Subcommand};
use error::{CliError, CliResult};
use nalgebra::DVector;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use sw_analysis::{PortraitGrid, damping_sweep, linearize, phase_portrait};
use sw_core::Tolerances;
use sw_model::{CoupledSwingModel, EventKind, SwingModel};
use sw_scenario::Scenario;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sw-cli")]
#[command(about = "Swingflow CLI - swing-equation dynamics of coupled generators", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file and build its model
    Validate {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// Summarize machines, coupling and events of a scenario
    Inspect {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// Evaluate the derivative of a scenario model
    Rhs {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Evaluation time; events due at or before it are applied
        #[arg(long, default_value_t = 0.0)]
        time: f64,
        /// Comma separated state in the scenario's layout (defaults to the initial state)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        state: Option<Vec<f64>>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the analytic Jacobian of a scenario model as CSV
    Jacobian {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Events due at or before this time are applied first
        #[arg(long, default_value_t = 0.0)]
        time: f64,
        /// Comma separated state in the scenario's layout (defaults to the initial state)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        state: Option<Vec<f64>>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Small-signal stability of a scenario model at a state
    Linearize {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Events due at or before this time are applied first
        #[arg(long, default_value_t = 0.0)]
        time: f64,
        /// Comma separated state in the scenario's layout (defaults to the initial state)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        state: Option<Vec<f64>>,
    },
    /// Eigenvalues of the single-machine model over a damping range
    SmibSweep {
        #[arg(long)]
        inertia: f64,
        #[arg(long)]
        coupling: f64,
        #[arg(long, default_value_t = 0.0)]
        d_min: f64,
        #[arg(long)]
        d_max: f64,
        #[arg(long, default_value_t = 50)]
        points: usize,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sample the single-machine vector field on a grid
    Portrait {
        #[arg(long)]
        inertia: f64,
        #[arg(long, default_value_t = 0.0)]
        damping: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        power: f64,
        #[arg(long)]
        coupling: f64,
        /// Phase limits as min,max
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        x_lims: Option<Vec<f64>>,
        /// Frequency limits as min,max
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        y_lims: Option<Vec<f64>>,
        /// Grid points per axis
        #[arg(long, default_value_t = 20)]
        points: usize,
        /// Scale every arrow to unit length
        #[arg(long)]
        normalize: bool,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load a vertices/links CSV pair and write its coupling matrix
    Topology {
        /// Vertices CSV (v_id, lon, lat)
        #[arg(long)]
        vertices: PathBuf,
        /// Links CSV (v_id_1, v_id_2, optional k)
        #[arg(long)]
        links: PathBuf,
        /// Coupling for links without an explicit k
        #[arg(long, default_value_t = 1.0)]
        k: f64,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Inspect { scenario_path } => cmd_inspect(&scenario_path),
        Commands::Rhs {
            scenario_path,
            time,
            state,
            output,
        } => cmd_rhs(&scenario_path, time, state, output.as_deref()),
        Commands::Jacobian {
            scenario_path,
            time,
            state,
            output,
        } => cmd_jacobian(&scenario_path, time, state, output.as_deref()),
        Commands::Linearize {
            scenario_path,
            time,
            state,
        } => cmd_linearize(&scenario_path, time, state),
        Commands::SmibSweep {
            inertia,
            coupling,
            d_min,
            d_max,
            points,
            output,
        } => cmd_smib_sweep(inertia, coupling, d_min, d_max, points, output.as_deref()),
        Commands::Portrait {
            inertia,
            damping,
            power,
            coupling,
            x_lims,
            y_lims,
            points,
            normalize,
            output,
        } => {
            let defaults = PortraitGrid::default();
            let grid = PortraitGrid {
                x_lims: limits("x-lims", x_lims, defaults.x_lims)?,
                y_lims: limits("y-lims", y_lims, defaults.y_lims)?,
                points,
                normalize,
            };
            cmd_portrait(inertia, damping, power, coupling, &grid, output.as_deref())
        }
        Commands::Topology {
            vertices,
            links,
            k,
            output,
        } => cmd_topology(&vertices, &links, k, output.as_deref()),
    }
}

/// Axis limits from a `min,max` option; the default applies only when the option is absent.
fn limits(
    flag: &'static str,
    values: Option<Vec<f64>>,
    default: (f64, f64),
) -> CliResult<(f64, f64)> {
    match values.as_deref() {
        None => Ok(default),
        Some([lo, hi]) => Ok((*lo, *hi)),
        Some(other) => Err(CliError::Limits {
            flag,
            count: other.len(),
        }),
    }
}

fn base_dir(scenario_path: &Path) -> &Path {
    scenario_path.parent().unwrap_or_else(|| Path::new("."))
}

fn load_model(scenario_path: &Path) -> CliResult<(Scenario, CoupledSwingModel)> {
    tracing::debug!(path = %scenario_path.display(), "loading scenario");
    let scenario = sw_scenario::load(scenario_path)?;
    let model = sw_scenario::build_model(&scenario, base_dir(scenario_path))?;
    Ok((scenario, model))
}

fn resolve_state(
    scenario: &Scenario,
    model: &CoupledSwingModel,
    state: Option<Vec<f64>>,
) -> CliResult<DVector<f64>> {
    match state {
        Some(values) if values.len() != 2 * model.n() => Err(CliError::State(format!(
            "expected {} values, got {}",
            2 * model.n(),
            values.len()
        ))),
        Some(values) => Ok(DVector::from_vec(values)),
        None => Ok(sw_scenario::initial_state(scenario)?),
    }
}

fn csv_writer(output: Option<&Path>) -> CliResult<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path).map_err(|source| CliError::Output {
            path: path.to_path_buf(),
            source,
        })?),
        None => Box::new(io::stdout()),
    };
    Ok(csv::Writer::from_writer(sink))
}

fn report_written(rows: usize, output: Option<&Path>) {
    if let Some(path) = output {
        eprintln!("✓ Wrote {} rows to {}", rows, path.display());
    }
}

fn cmd_validate(scenario_path: &Path) -> CliResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let (_scenario, model) = load_model(scenario_path)?;
    println!(
        "✓ Scenario is valid ({} machines, {} events)",
        model.n(),
        model.pending_events().len()
    );
    Ok(())
}

fn cmd_inspect(scenario_path: &Path) -> CliResult<()> {
    let (scenario, model) = load_model(scenario_path)?;
    let n = model.n();

    println!("Scenario: {} (version {})", scenario.name, scenario.version);
    println!("Layout: {:?}", model.layout());

    println!("\nMachines:");
    for (i, machine) in scenario.machines.iter().enumerate() {
        println!(
            "  [{}] {} - M={} D={} P={}",
            i,
            machine.id,
            model.inertias()[i],
            model.dampings()[i],
            model.powers()[i]
        );
    }

    let k = model.coupling();
    println!("\nLines:");
    let mut lines = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            if k[(i, j)] != 0.0 || k[(j, i)] != 0.0 {
                println!(
                    "  {} - {} (K={})",
                    scenario.machines[i].id,
                    scenario.machines[j].id,
                    k[(i, j)]
                );
                lines += 1;
            }
        }
    }
    if lines == 0 {
        println!("  (none)");
    }

    println!("\nEvents:");
    if model.pending_events().is_empty() {
        println!("  (none)");
    }
    for event in model.pending_events().iter() {
        match &event.kind {
            EventKind::LoadJump { delta } => {
                println!("  t={} {} {:?}", event.time, event.kind.label(), delta.as_slice())
            }
            EventKind::LineDrop { from, to } => println!(
                "  t={} {} {} - {}",
                event.time,
                event.kind.label(),
                scenario.machines[*from].id,
                scenario.machines[*to].id
            ),
            EventKind::Replace(_) => println!("  t={} {}", event.time, event.kind.label()),
        }
    }

    if let Some(initial) = &scenario.initial_state {
        println!("\nInitial state:");
        println!("  phi:   {:?}", initial.phi);
        println!("  omega: {:?}", initial.omega);
    }
    Ok(())
}

fn cmd_rhs(
    scenario_path: &Path,
    time: f64,
    state: Option<Vec<f64>>,
    output: Option<&Path>,
) -> CliResult<()> {
    let (scenario, mut model) = load_model(scenario_path)?;
    let state = resolve_state(&scenario, &model, state)?;
    let derivative = model.derivative(time, &state)?;

    for applied in model.applied_events() {
        eprintln!(
            "applied {} scheduled at t={}",
            applied.event.kind.label(),
            applied.event.time
        );
    }

    let n = model.n();
    let layout = model.layout();
    let mut writer = csv_writer(output)?;
    writer.write_record(["machine", "phi", "omega", "dphi", "domega"])?;
    for (i, machine) in scenario.machines.iter().enumerate() {
        let phi = layout.phi_index(i, n);
        let omega = layout.omega_index(i, n);
        writer.write_record([
            machine.id.clone(),
            state[phi].to_string(),
            state[omega].to_string(),
            derivative[phi].to_string(),
            derivative[omega].to_string(),
        ])?;
    }
    writer.flush()?;
    report_written(n, output);
    Ok(())
}

fn cmd_jacobian(
    scenario_path: &Path,
    time: f64,
    state: Option<Vec<f64>>,
    output: Option<&Path>,
) -> CliResult<()> {
    let (scenario, mut model) = load_model(scenario_path)?;
    let state = resolve_state(&scenario, &model, state)?;
    model.apply_due_events(time);
    let jacobian = model.jacobian(&state, time)?;

    let mut writer = csv_writer(output)?;
    for row in jacobian.row_iter() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    report_written(jacobian.nrows(), output);
    Ok(())
}

fn cmd_linearize(scenario_path: &Path, time: f64, state: Option<Vec<f64>>) -> CliResult<()> {
    let (scenario, mut model) = load_model(scenario_path)?;
    let state = resolve_state(&scenario, &model, state)?;
    let applied = model.apply_due_events(time);
    let linearization = linearize(&model, &state, time, Tolerances::default())?;
    let report = &linearization.report;

    println!("Scenario: {}", scenario.name);
    println!("  Events applied up to t={}: {}", time, applied);
    println!("  State dimension: {}", linearization.jacobian.nrows());
    println!("  Max real part: {:.6e}", report.max_real_part);
    println!("  Stability: {:?}", report.stability);
    println!("\nEigenvalues:");
    for lambda in &report.eigenvalues {
        println!("  {:+.6e} {:+.6e}i", lambda.re, lambda.im);
    }
    Ok(())
}

fn cmd_smib_sweep(
    inertia: f64,
    coupling: f64,
    d_min: f64,
    d_max: f64,
    points: usize,
    output: Option<&Path>,
) -> CliResult<()> {
    let sweep = damping_sweep(inertia, coupling, d_min, d_max, points)?;

    let mut writer = csv_writer(output)?;
    writer.write_record(["damping", "re_1", "im_1", "re_2", "im_2", "oscillatory"])?;
    for point in &sweep {
        let [a, b] = point.eigenvalues;
        writer.write_record([
            point.damping.to_string(),
            a.re.to_string(),
            a.im.to_string(),
            b.re.to_string(),
            b.im.to_string(),
            point.is_oscillatory().to_string(),
        ])?;
    }
    writer.flush()?;
    report_written(sweep.len(), output);
    Ok(())
}

fn cmd_portrait(
    inertia: f64,
    damping: f64,
    power: f64,
    coupling: f64,
    grid: &PortraitGrid,
    output: Option<&Path>,
) -> CliResult<()> {
    let model = SwingModel::new(inertia, damping, power, coupling)?;
    let portrait = phase_portrait(|t, x| model.derivative(t, x), grid, 0.0)?;

    let mut writer = csv_writer(output)?;
    writer.write_record(["phi", "omega", "dphi", "domega"])?;
    let mut rows = 0;
    for (x, y, u, v) in portrait.samples() {
        writer.write_record([x.to_string(), y.to_string(), u.to_string(), v.to_string()])?;
        rows += 1;
    }
    writer.flush()?;
    report_written(rows, output);
    Ok(())
}

fn cmd_topology(vertices: &Path, links: &Path, k: f64, output: Option<&Path>) -> CliResult<()> {
    let topology = sw_grid::load_grid_csv(vertices, links)?;
    eprintln!(
        "Loaded topology: {} vertices, {} lines",
        topology.vertex_count(),
        topology.line_count()
    );

    let ids: Vec<String> = topology.vertices().map(|v| v.id.clone()).collect();
    let matrix = topology.coupling_matrix(k);

    let mut writer = csv_writer(output)?;
    writer.write_record(std::iter::once("v_id".to_string()).chain(ids.iter().cloned()))?;
    for (id, row) in ids.iter().zip(matrix.row_iter()) {
        writer.write_record(
            std::iter::once(id.clone()).chain(row.iter().map(|v| v.to_string())),
        )?;
    }
    writer.flush()?;
    report_written(ids.len(), output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_default_only_when_absent() {
        assert_eq!(limits("x-lims", None, (-1.0, 1.0)).unwrap(), (-1.0, 1.0));
        assert_eq!(
            limits("x-lims", Some(vec![-3.0, 3.0]), (-1.0, 1.0)).unwrap(),
            (-3.0, 3.0)
        );
    }

    #[test]
    fn limits_reject_wrong_count() {
        for values in [vec![5.0], vec![1.0, 2.0, 3.0]] {
            let count = values.len();
            let err = limits("y-lims", Some(values), (-1.0, 1.0)).unwrap_err();
            assert!(matches!(
                err,
                CliError::Limits { flag: "y-lims", count: c } if c == count
            ));
        }
    }

    #[test]
    fn portrait_limits_parse_negative_values() {
        let cli = Cli::try_parse_from([
            "sw-cli", "portrait", "--inertia", "1", "--coupling", "1", "--x-lims", "-3,3",
        ])
        .unwrap();
        match cli.command {
            Commands::Portrait { x_lims, .. } => assert_eq!(x_lims, Some(vec![-3.0, 3.0])),
            _ => panic!("expected portrait command"),
        }
    }
}
