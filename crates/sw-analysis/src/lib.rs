//! Read-only analysis of swing models.
//!
//! This crate consumes the derivative and Jacobian of a model and never
//! mutates it. It provides finite-difference Jacobians for checking analytic
//! linearizations, eigenvalue-based small-signal stability, the SMIB damping
//! sweep, and phase-portrait sampling of planar systems.

pub mod error;
pub mod jacobian;
pub mod portrait;
pub mod stability;

pub use error::{AnalysisError, AnalysisResult};
pub use jacobian::{central_difference_jacobian, max_relative_error};
pub use portrait::{PhasePortrait, PortraitGrid, phase_portrait};
pub use stability::{
    DampingSweepPoint, Linearization, Stability, StabilityReport, damping_sweep, eigenvalues,
    linearize, smib_eigenvalues, smib_state_matrix, stability_report,
};
