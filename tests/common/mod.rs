#![allow(dead_code)]

use nalgebra::Point3;
use vehicle_dynamics::drivetrain::types::{Chassis, Vec3, WheelCommand, WheelContactSample};
use vehicle_dynamics::vehicle::AxleConfig;

pub const DT: f32 = 1.0 / 60.0;

/// Scriptable physics port: the test sets velocity, heading and wheel samples,
/// and reads back everything the dynamics core wrote.
#[derive(Debug, Clone)]
pub struct FakeChassis {
    pub velocity: Vec3,
    pub heading: f32,
    pub up: Vec3,
    pub com: Point3<f32>,
    pub wheels: Vec<Option<WheelContactSample>>,
    pub forces: Vec<Vec3>,
    pub point_forces: Vec<(Vec3, Point3<f32>)>,
    pub commands: Vec<WheelCommand>,
    pub velocity_writes: usize,
}

impl FakeChassis {
    pub fn grounded(wheels: usize) -> Self {
        Self {
            velocity: Vec3::zeros(),
            heading: 0.0,
            up: Vec3::y(),
            com: Point3::origin(),
            wheels: vec![Some(WheelContactSample { rpm: 0.0, forward_slip: 0.0, grounded: true }); wheels],
            forces: Vec::new(),
            point_forces: Vec::new(),
            commands: vec![WheelCommand::default(); wheels],
            velocity_writes: 0,
        }
    }

    pub fn airborne(wheels: usize) -> Self {
        let mut c = Self::grounded(wheels);
        for s in c.wheels.iter_mut().flatten() {
            s.grounded = false;
        }
        c
    }

    pub fn set_wheel_rpm(&mut self, rpm: f32) {
        for s in self.wheels.iter_mut().flatten() {
            s.rpm = rpm;
        }
    }

    pub fn wheel_mut(&mut self, wheel: usize) -> &mut WheelContactSample {
        self.wheels[wheel].get_or_insert_with(WheelContactSample::default)
    }
}

impl Chassis for FakeChassis {
    fn linear_velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.velocity_writes += 1;
    }

    fn heading(&self) -> f32 {
        self.heading
    }

    fn up(&self) -> Vec3 {
        self.up
    }

    fn center_of_mass(&self) -> Point3<f32> {
        self.com
    }

    fn add_force(&mut self, force: Vec3) {
        self.forces.push(force);
    }

    fn add_force_at_point(&mut self, force: Vec3, point: Point3<f32>) {
        self.point_forces.push((force, point));
    }

    fn wheel_sample(&self, wheel: usize) -> Option<WheelContactSample> {
        self.wheels.get(wheel).copied().flatten()
    }

    fn apply_wheel_command(&mut self, wheel: usize, command: WheelCommand) {
        if let Some(slot) = self.commands.get_mut(wheel) {
            *slot = command;
        }
    }
}

/// Front steering axle (0, 1), rear motor axle (2, 3).
pub fn rear_drive() -> Vec<AxleConfig> {
    vec![
        AxleConfig::new(0, 1, 0.33).with_steering().with_brake_bias(0.6),
        AxleConfig::new(2, 3, 0.33).with_motor().with_brake_bias(0.4),
    ]
}
