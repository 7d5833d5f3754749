//! Error types for analysis routines.

use sw_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Non-finite {what}")]
    NonFinite { what: &'static str },

    #[error("Field returned {actual} components, expected {expected}")]
    FieldDimension { expected: usize, actual: usize },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
