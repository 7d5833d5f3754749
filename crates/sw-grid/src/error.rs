//! Topology construction and loading errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Duplicate vertex id '{0}'")]
    DuplicateVertex(String),

    #[error("Line {from} - {to} references unknown vertex '{missing}'")]
    UnknownVertex {
        from: String,
        to: String,
        missing: String,
    },

    #[error("Line at vertex '{0}' connects it to itself")]
    SelfLoop(String),

    #[error("Non-finite {what} for '{id}'")]
    NonFinite { what: &'static str, id: String },
}

pub type GridResult<T> = Result<T, GridError>;
