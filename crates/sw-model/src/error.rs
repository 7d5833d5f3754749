//! Error types for model construction and evaluation.

use sw_core::SwError;
use thiserror::Error;

/// Errors raised by the swing models.
///
/// Every contract violation surfaces here; the models never clamp or skip
/// invalid input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid parameter: {0}")]
    Parameter(#[from] SwError),

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Coupling matrix must be {n}x{n}, got {rows}x{cols}")]
    CouplingShape { n: usize, rows: usize, cols: usize },

    #[error("Coupling matrix diagonal must be zero: entry ({index}, {index}) is {value}")]
    SelfCoupling { index: usize, value: f64 },

    #[error("Invalid event #{index} at t={time}: {reason}")]
    InvalidEvent {
        index: usize,
        time: f64,
        reason: String,
    },
}

pub type ModelResult<T> = Result<T, ModelError>;
