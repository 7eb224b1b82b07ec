// ==============================================================================
// steering.rs — STEER ANGLE + STABILITY ASSIST (YAW DAMPING)
// ==============================================================================
// steer_angle = max_steering_angle · steer_input, same on both wheels of every
// steering axle.
//
// Stability assist rotates the linear velocity about world up by
//
//   yaw_delta · auto_steer        (degrees)
//
// where yaw_delta is the heading change since the last assisted tick. It only
// runs with all wheels on the ground; when any wheel is airborne it bails
// before recording the heading. Deltas of 10° or more per tick are treated as
// heading wrap-around / teleports and skipped.
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;

use crate::drivetrain::types::Vec3;

pub const MAX_ASSIST_YAW_DELTA: f32 = 10.0;

pub fn steer_angle(max_steering_angle: f32, steer_input: f32) -> f32 {
    max_steering_angle * steer_input.clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StabilityAssist {
    prev_heading: Option<f32>,
}

impl StabilityAssist {
    pub fn prev_heading(&self) -> Option<f32> {
        self.prev_heading
    }

    /// Returns the corrected velocity, or `None` when the assist does not
    /// touch it this tick.
    pub fn correct(
        &mut self,
        heading: f32,
        all_grounded: bool,
        velocity: Vec3,
        auto_steer: f32,
    ) -> Option<Vec3> {
        if !all_grounded {
            return None;
        }

        // first grounded tick only records the heading
        let prev = self.prev_heading.replace(heading)?;
        let yaw_delta = heading - prev;
        if yaw_delta.abs() >= MAX_ASSIST_YAW_DELTA {
            return None;
        }

        let turn = UnitQuaternion::from_axis_angle(
            &Vector3::y_axis(),
            (yaw_delta * auto_steer).to_radians(),
        );
        Some(turn * velocity)
    }
}
