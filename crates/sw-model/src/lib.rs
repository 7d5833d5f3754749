//! Swing-equation models for power-grid generators.
//!
//! Provides:
//! - Single machine infinite bus model (`SwingModel`)
//! - N-machine coupled model with a scheduled event queue (`CoupledSwingModel`)
//! - Tagged event payloads: load jumps, line drops and parameter replacement
//! - `SwingSystem`: the derivative/Jacobian boundary consumed by external integrators
//!
//! The models never step time themselves. An integrator calls
//! [`SwingSystem::rhs`] repeatedly; the coupled model applies due events
//! before each evaluation, so it is a time-dependent vector field.

pub mod coupled;
pub mod error;
pub mod events;
pub mod layout;
pub mod smib;
pub mod system;

// Re-exports for public API
pub use coupled::CoupledSwingModel;
pub use error::{ModelError, ModelResult};
pub use events::{AppliedEvent, Event, EventKind, EventObserver, EventSchedule, ParameterReplacement};
pub use layout::StateLayout;
pub use smib::SwingModel;
pub use system::SwingSystem;
