use rapier3d::control::DynamicRayCastVehicleController;
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dynamics::VehicleDynamics;
use crate::input::DriverInput;

/// Rigid-body and wheel-mount parameters for the physics host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChassisConfig {
    pub mass: f32,              // kg
    pub linear_damping: f32,
    pub angular_damping: f32,

    // --- Geometry ---
    pub wheelbase: f32,         // meters (front axle to rear axle)
    pub track_width: f32,       // meters (left to right)
    pub wheel_radius: f32,      // meters

    // --- Suspension (rapier ray-cast wheels) ---
    pub suspension_rest_length: f32,
    pub suspension_stiffness: f32,
    pub suspension_compression: f32,
    pub suspension_damping: f32,
    pub max_suspension_force: f32,
    pub friction_slip: f32,

    // --- Brake split ---
    pub front_brake_bias: f32,  // 0..1, rear gets the rest

    // --- Chassis geometry ---
    pub chassis_half_extents: [f32; 3], // [hx, hy, hz] meters, x forward
    pub chassis_com_offset: [f32; 3],   // local offset from collider center
}

pub const GT86: ChassisConfig = ChassisConfig {
    mass: 1350.0,
    linear_damping: 0.0,      // drag comes from the force model
    angular_damping: 0.6,

    wheelbase: 2.5,
    track_width: 1.5,
    wheel_radius: 0.33,

    suspension_rest_length: 0.3,
    suspension_stiffness: 30.0,
    suspension_compression: 4.4,
    suspension_damping: 2.3,
    max_suspension_force: 12_000.0,
    friction_slip: 1.2,

    front_brake_bias: 0.6,

    chassis_half_extents: [2.1, 0.35, 1.0],
    chassis_com_offset: [0.0, -0.15, 0.0], // slightly below visual center
};

impl ChassisConfig {
    /// Front steering axle + rear driven axle. Wheels are numbered
    /// FL, FR, RL, RR in the order the physics host registers them.
    pub fn rear_drive_axles(&self) -> Vec<AxleConfig> {
        vec![
            AxleConfig::new(0, 1, self.wheel_radius)
                .with_steering()
                .with_brake_bias(self.front_brake_bias),
            AxleConfig::new(2, 3, self.wheel_radius)
                .with_motor()
                .with_brake_bias(1.0 - self.front_brake_bias),
        ]
    }
}

/// One left/right pair of wheel actuators. Immutable once the vehicle is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxleConfig {
    pub left: usize,            // wheel index in the physics host
    pub right: usize,
    pub motor: bool,
    pub steering: bool,
    pub brake_bias: f32,        // fraction of max brake torque per wheel
    pub left_radius: f32,
    pub right_radius: f32,
}

impl AxleConfig {
    pub fn new(left: usize, right: usize, radius: f32) -> Self {
        Self {
            left,
            right,
            motor: false,
            steering: false,
            brake_bias: 0.5,
            left_radius: radius,
            right_radius: radius,
        }
    }

    pub fn with_motor(mut self) -> Self {
        self.motor = true;
        self
    }

    pub fn with_steering(mut self) -> Self {
        self.steering = true;
        self
    }

    pub fn with_brake_bias(mut self, bias: f32) -> Self {
        self.brake_bias = bias;
        self
    }

    pub fn with_radii(mut self, left: f32, right: f32) -> Self {
        self.left_radius = left;
        self.right_radius = right;
        self
    }

    pub fn wheels(&self) -> [usize; 2] {
        [self.left, self.right]
    }
}

/// A vehicle living in the physics world.
pub struct Vehicle {
    pub body: RigidBodyHandle,                      // the chassis body
    pub chassis: ChassisConfig,
    pub controller: DynamicRayCastVehicleController,// ray-cast wheels
    pub dynamics: VehicleDynamics,                  // drivetrain core
    pub input: DriverInput,                         // latest driver input
    pub wheel_rotation: Vec<f32>,                   // last seen axle rotation (rad)
    pub wheel_rpm: Vec<f32>,                        // derived spin, rev/min
}
