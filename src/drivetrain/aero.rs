// ==============================================================================
// aero.rs — QUADRATIC DRAG, DOWNFORCE, TIRE DRAG
// ------------------------------------------------------------------------------
// All three contributions are evaluated once per tick from the pre-tick
// velocity:
//
//   drag      = -c_d · |v| · v          (at COM)
//   downforce = -up · c_df · |v|²       (at COM, against the body's up axis)
//   tire drag = -c_t · v                (at the world-space center of mass)
// ==============================================================================

use serde::Serialize;

use crate::config::TunableParameters;
use crate::drivetrain::types::{Chassis, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AeroForces {
    pub drag: [f32; 3],
    pub downforce: [f32; 3],
    pub tire_drag: [f32; 3],
}

pub fn compute_forces(params: &TunableParameters, velocity: Vec3, up: Vec3) -> AeroForces {
    let speed = velocity.norm();

    let drag = -velocity * (params.drag_coefficient * speed);
    let downforce = -up * (params.downforce_coefficient * speed * speed);
    let tire_drag = -velocity * params.tire_drag_coefficient;

    AeroForces {
        drag: drag.into(),
        downforce: downforce.into(),
        tire_drag: tire_drag.into(),
    }
}

/// Compute from the chassis' current velocity and push the forces into it.
pub fn apply_forces(params: &TunableParameters, chassis: &mut impl Chassis) -> AeroForces {
    let forces = compute_forces(params, chassis.linear_velocity(), chassis.up());

    chassis.add_force(Vec3::from(forces.drag));
    chassis.add_force(Vec3::from(forces.downforce));
    let com = chassis.center_of_mass();
    chassis.add_force_at_point(Vec3::from(forces.tire_drag), com);

    forces
}
