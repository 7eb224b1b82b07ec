//! Core shared types for `drivetrain` (engine-agnostic).
// drivetrain/types.rs
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

pub type Vec3 = Vector3<f32>;

// ----- scalar helpers -----
/// Linear interpolation with `t` clamped to `[0, 1]`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

#[inline]
pub fn lerp64(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// rev/min → rad/s
#[inline]
pub fn rpm_to_rad_per_sec(rpm: f32) -> f32 {
    rpm * std::f32::consts::TAU / 60.0
}

// ============================================
// Wheel feedback / actuator records
// ============================================

/// Per-wheel, per-tick feedback from the physics engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelContactSample {
    pub rpm: f32,            // signed rotational speed, rev/min
    pub forward_slip: f32,   // longitudinal slip scalar
    pub grounded: bool,
}

/// Per-wheel actuator command written back to the physics engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelCommand {
    pub motor_torque: f32,   // N·m, signed (negative in reverse)
    pub brake_torque: f32,   // N·m, ≥ 0
    pub steer_angle: f32,    // degrees
}

// ============================================
// Physics engine port
// ============================================

/// The rigid-body side of the vehicle, as seen by the dynamics core.
///
/// Reads reflect the state before this tick's commands are applied; writes
/// are consumed by the physics engine on its next step.
pub trait Chassis {
    fn linear_velocity(&self) -> Vec3;
    fn set_linear_velocity(&mut self, velocity: Vec3);

    /// Yaw about world up, degrees in `[0, 360)`.
    fn heading(&self) -> f32;

    /// The body's local up axis in world space (unit length).
    fn up(&self) -> Vec3;

    /// World-space center of mass.
    fn center_of_mass(&self) -> Point3<f32>;

    /// Force through the center of mass.
    fn add_force(&mut self, force: Vec3);
    fn add_force_at_point(&mut self, force: Vec3, point: Point3<f32>);

    /// `None` when the backend has no wheel with this index.
    fn wheel_sample(&self, wheel: usize) -> Option<WheelContactSample>;
    fn apply_wheel_command(&mut self, wheel: usize, command: WheelCommand);
}
