// ==============================================================================
// dynamics.rs — PER-TICK VEHICLE DYNAMICS
// ==============================================================================
// One `tick(dt)` per physics step, in a fixed order:
//
//   1. ignition command / emergency stop
//   2. refresh wheel samples, then aero + tire drag from the pre-tick velocity
//   3. gearbox: manual request, automatic decision, ratio interpolation
//   4. engine RPM from the sample axle
//   5. drive torque, per-axle motor/brake split, traction feedback
//   6. steering + stability assist
//   7. wheel commands written to the chassis
//   8. clock advances by dt
//
// The core never reads a wall clock. Same inputs and dt sequence produce the
// same state bit for bit.
// ==============================================================================

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TunableParameters;
use crate::drivetrain::aero::{self, AeroForces};
use crate::drivetrain::engine::{self, Ignition};
use crate::drivetrain::gearbox::{Gear, Gearbox, ShiftRequest};
use crate::drivetrain::steering::{self, StabilityAssist};
use crate::drivetrain::traction::{self, TractionControl};
use crate::drivetrain::types::{rpm_to_rad_per_sec, Chassis, WheelCommand, WheelContactSample};
use crate::error::ConfigError;
use crate::input::DriverInput;
use crate::state::{DrivetrainSnapshot, VehicleState};
use crate::vehicle::AxleConfig;

/// Returned by `wheel_angular_velocity` for a wheel the host has no sample for.
pub const MISSING_WHEEL_SPEED: f32 = -1.0;

/// What one tick did, for telemetry and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub forces: AeroForces,
    pub commands: Vec<(usize, WheelCommand)>,
    pub velocity_correction: Option<[f32; 3]>,
    pub shift: Option<ShiftRequest>,
}

#[derive(Debug, Clone)]
pub struct VehicleDynamics {
    params: TunableParameters,
    axles: Vec<AxleConfig>,
    state: VehicleState,
}

impl VehicleDynamics {
    pub fn new(params: TunableParameters, axles: Vec<AxleConfig>) -> Result<Self, ConfigError> {
        params.validate()?;

        if params.rpm_sample_axle >= axles.len() {
            return Err(ConfigError::RpmAxleOutOfRange {
                index: params.rpm_sample_axle,
                count: axles.len(),
            });
        }

        let mut seen = Vec::new();
        for (i, axle) in axles.iter().enumerate() {
            for wheel in axle.wheels() {
                if seen.contains(&wheel) {
                    return Err(ConfigError::DuplicateWheel { axle: i, wheel });
                }
                seen.push(wheel);
            }
            if !(0.0..=1.0).contains(&axle.brake_bias) {
                return Err(ConfigError::OutOfUnitRange {
                    name: "brake_bias",
                    value: axle.brake_bias,
                });
            }
        }

        let state = Self::fresh_state(&params, &axles);
        let mut dynamics = Self { params, axles, state };
        dynamics.initialize();
        Ok(dynamics)
    }

    fn fresh_state(params: &TunableParameters, axles: &[AxleConfig]) -> VehicleState {
        let wheel_count = axles
            .iter()
            .flat_map(|a| a.wheels())
            .max()
            .map_or(0, |w| w + 1);

        VehicleState {
            ignition: Ignition::Off,
            gearbox: Gearbox::new(params.gear_ratios.len()),
            rpm: 0.0,
            drive_torque: 0.0,
            traction: TractionControl::new(params),
            assist: StabilityAssist::default(),
            clock: 0.0,
            ticks: 0,
            samples: vec![None; wheel_count],
            steer_angles: vec![0.0; wheel_count],
            missing_reported: vec![false; wheel_count],
        }
    }

    /// Reset all mutable state: first gear, ignition off, reduced ceiling.
    pub fn initialize(&mut self) {
        self.state = Self::fresh_state(&self.params, &self.axles);
        debug!(
            gears = self.params.gear_ratios.len(),
            ceiling = self.state.traction.ceiling(),
            "drivetrain initialized"
        );
    }

    pub fn tick(&mut self, dt: f32, input: &DriverInput, chassis: &mut impl Chassis) -> TickReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut input = input.sanitized();

        // 1) ignition
        if input.emergency_stop {
            input.handbrake = true;
            input.ignition = Some(Ignition::Off);
        }
        if let Some(ignition) = input.ignition {
            if ignition != self.state.ignition {
                info!(?ignition, "ignition changed");
                self.state.ignition = ignition;
            }
        }
        let ignition = self.state.ignition;

        // 2) wheel samples + forces
        self.refresh_samples(&*chassis);
        let speed = chassis.linear_velocity().norm();
        let forces = aero::apply_forces(&self.params, chassis);

        // 3) gearbox
        let now = self.state.clock;
        let mut shift = None;
        if let Some(request) = input.shift {
            if self.state.gearbox.request(request, now) {
                shift = Some(request);
            }
        }
        if shift.is_none() && self.params.automatic && ignition.is_on() {
            let auto = self.state.gearbox.automatic_request(
                &self.params,
                now,
                self.state.rpm,
                input.accel,
                speed,
            );
            if let Some(request) = auto {
                if self.state.gearbox.request(request, now) {
                    shift = Some(request);
                }
            }
        }
        self.state.gearbox.update(&self.params, now);
        let ratio = self.state.gearbox.ratio(&self.params.gear_ratios);

        // 4) RPM
        let sample_axle = &self.axles[self.params.rpm_sample_axle];
        let wheel_rpm = engine::sample_axle_speed(
            self.sample(sample_axle.left),
            self.sample(sample_axle.right),
        );
        self.state.rpm = engine::step_rpm(&self.params, self.state.rpm, wheel_rpm, ratio, ignition, dt);

        // 5) torque + traction
        self.state.drive_torque =
            traction::drive_torque(&self.params, self.state.rpm, ratio, self.state.traction.ceiling());
        let brake = if input.handbrake { 1.0 } else { input.brake };
        let split = traction::distribute(
            &self.params,
            &self.axles,
            self.state.drive_torque,
            input.accel,
            brake,
            ignition,
        );

        for axle in self.axles.iter().filter(|a| a.motor) {
            for wheel in axle.wheels() {
                if let Some(s) = self.sample(wheel).filter(|s| s.grounded) {
                    self.state.traction.feedback(&self.params, s.forward_slip);
                }
            }
        }

        // 6) steering + stability assist
        let angle = steering::steer_angle(self.params.max_steering_angle, input.steer);
        let mut velocity_correction = None;
        if ignition.is_on() {
            let all_grounded = self
                .axles
                .iter()
                .flat_map(|a| a.wheels())
                .all(|w| self.sample(w).is_some_and(|s| s.grounded));
            let corrected = self.state.assist.correct(
                chassis.heading(),
                all_grounded,
                chassis.linear_velocity(),
                self.params.auto_steer,
            );
            if let Some(v) = corrected {
                chassis.set_linear_velocity(v);
                velocity_correction = Some(v.into());
            }
        }

        // 7) wheel commands
        let mut commands = Vec::with_capacity(self.axles.len() * 2);
        for (axle, torque) in self.axles.iter().zip(&split) {
            let steer_angle = if axle.steering { angle } else { 0.0 };
            for wheel in axle.wheels() {
                let command = WheelCommand {
                    motor_torque: torque.motor,
                    brake_torque: torque.brake,
                    steer_angle,
                };
                chassis.apply_wheel_command(wheel, command);
                self.state.steer_angles[wheel] = steer_angle;
                commands.push((wheel, command));
            }
        }

        // 8) clock
        self.state.clock += f64::from(dt);
        self.state.ticks += 1;

        TickReport { forces, commands, velocity_correction, shift }
    }

    fn refresh_samples(&mut self, chassis: &impl Chassis) {
        for wheel in self.axles.iter().flat_map(|a| a.wheels()) {
            let sample = chassis.wheel_sample(wheel);
            if sample.is_none() && !self.state.missing_reported[wheel] {
                warn!(wheel, "physics host has no sample for wheel");
                self.state.missing_reported[wheel] = true;
            }
            self.state.samples[wheel] = sample;
        }
    }

    fn sample(&self, wheel: usize) -> Option<WheelContactSample> {
        self.state.samples.get(wheel).copied().flatten()
    }

    // ---------------------------------------------------------------------
    // queries
    // ---------------------------------------------------------------------

    pub fn params(&self) -> &TunableParameters {
        &self.params
    }

    pub fn axles(&self) -> &[AxleConfig] {
        &self.axles
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn ignition(&self) -> Ignition {
        self.state.ignition
    }

    pub fn gearbox(&self) -> &Gearbox {
        &self.state.gearbox
    }

    pub fn gear(&self) -> Gear {
        self.state.gearbox.gear()
    }

    /// Signed gear number, reverse = -1.
    pub fn gear_number(&self) -> i32 {
        self.gear().number()
    }

    pub fn is_reverse(&self) -> bool {
        self.state.gearbox.is_reverse()
    }

    pub fn rpm(&self) -> f32 {
        self.state.rpm
    }

    /// RPM scaled to `max_rpm`.
    pub fn rpm_ratio(&self) -> f32 {
        self.state.rpm / self.params.max_rpm
    }

    /// rad/s, or [`MISSING_WHEEL_SPEED`] when the wheel has no sample.
    pub fn wheel_angular_velocity(&self, wheel: usize) -> f32 {
        match self.sample(wheel) {
            Some(s) => rpm_to_rad_per_sec(s.rpm),
            None => {
                warn!(wheel, "wheel speed requested for a wheel with no sample");
                MISSING_WHEEL_SPEED
            }
        }
    }

    /// Mean steer angle of the front axle, degrees.
    pub fn steering_angle(&self) -> f32 {
        let Some(front) = self.axles.first() else {
            return 0.0;
        };
        let [l, r] = front.wheels().map(|w| self.state.steer_angles.get(w).copied().unwrap_or(0.0));
        (l + r) * 0.5
    }

    pub fn traction_ceiling(&self) -> f32 {
        self.state.traction.ceiling()
    }

    pub fn drive_torque(&self) -> f32 {
        self.state.drive_torque
    }

    pub fn clock(&self) -> f64 {
        self.state.clock
    }

    pub fn snapshot(&self) -> DrivetrainSnapshot {
        DrivetrainSnapshot {
            ignition: self.state.ignition,
            gear: self.gear(),
            gear_position: self.state.gearbox.position(),
            shifting: self.state.gearbox.is_shifting(),
            rpm: self.state.rpm,
            rpm_ratio: self.rpm_ratio(),
            drive_torque: self.state.drive_torque,
            traction_ceiling: self.traction_ceiling(),
            steering_angle: self.steering_angle(),
            clock: self.state.clock,
        }
    }
}
