use serde::Serialize;

use crate::drivetrain::engine::Ignition;
use crate::drivetrain::gearbox::{Gear, Gearbox};
use crate::drivetrain::steering::StabilityAssist;
use crate::drivetrain::traction::TractionControl;
use crate::drivetrain::types::WheelContactSample;

/// Mutable per-vehicle state, advanced only by `VehicleDynamics::tick`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleState {
    pub ignition: Ignition,
    pub gearbox: Gearbox,
    pub rpm: f32,
    pub drive_torque: f32,                          // last computed, N·m
    pub traction: TractionControl,
    pub assist: StabilityAssist,
    pub clock: f64,                                 // accumulated dt, seconds
    pub ticks: u64,
    pub samples: Vec<Option<WheelContactSample>>,   // indexed by wheel id
    pub steer_angles: Vec<f32>,                     // degrees, indexed by wheel id
    #[serde(skip)]
    pub missing_reported: Vec<bool>,                // warn once per wheel
}

/// Read-only view of the drivetrain for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrivetrainSnapshot {
    pub ignition: Ignition,
    pub gear: Gear,
    pub gear_position: f32,
    pub shifting: bool,
    pub rpm: f32,
    pub rpm_ratio: f32,
    pub drive_torque: f32,
    pub traction_ceiling: f32,
    pub steering_angle: f32,
    pub clock: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub id: String,
    pub position: [f32; 3],
    pub speed: f32,             // m/s
    pub drivetrain: DrivetrainSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub vehicles: Vec<VehicleSnapshot>,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
