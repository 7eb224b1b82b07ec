//! vehicle-dynamics: fixed-step drivetrain core (engine, gearbox, torque,
//! traction control, stability assist, aero) on top of a rapier3d host.

pub mod config;
pub mod drivetrain;
pub mod dynamics;
pub mod error;
pub mod input;
pub mod physics;
pub mod state;
pub mod vehicle;

pub use config::TunableParameters;
pub use dynamics::{TickReport, VehicleDynamics};
pub use error::ConfigError;
