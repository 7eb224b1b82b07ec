//! drivetrain - engine-agnostic vehicle helpers (pure types + per-tick steps)

pub mod types;
pub mod curve;
pub mod aero;
pub mod engine;
pub mod gearbox;
pub mod traction;
pub mod steering;

pub use types::*;
pub use curve::Curve;
pub use engine::Ignition;
pub use gearbox::{Gear, Gearbox, ShiftPhase, ShiftRequest};
