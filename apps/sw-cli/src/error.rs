//! Error type for the command-line front end.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Scenario error: {0}")]
    Scenario(#[from] sw_scenario::ScenarioError),

    #[error("Model error: {0}")]
    Model(#[from] sw_model::ModelError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] sw_analysis::AnalysisError),

    #[error("Topology error: {0}")]
    Grid(#[from] sw_grid::GridError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write output file: {path}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("--{flag} takes exactly two values (min,max), got {count}")]
    Limits { flag: &'static str, count: usize },

    #[error("Invalid state vector: {0}")]
    State(String),
}

pub type CliResult<T> = Result<T, CliError>;
