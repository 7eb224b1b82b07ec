// ==============================================================================
// physics.rs — RAPIER HOST WORLD
// ==============================================================================
// Owns the rapier pipeline, a flat ground box and the vehicles. Each step:
//
//   1. refresh the query pipeline (wheel rays)
//   2. per vehicle: clear user forces, run the drivetrain tick against a
//      `RapierChassis` view, then let the ray-cast controller resolve
//      suspension + tire impulses
//   3. integrate
//   4. reset bodies that left the world
//
// Vehicles are kept in a BTreeMap so iteration order, and therefore the
// simulation, is deterministic.
// ==============================================================================

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use rapier3d::control::{DynamicRayCastVehicleController, WheelTuning};
use rapier3d::prelude::*;
use tracing::{info, warn};

use crate::config::TunableParameters;
use crate::drivetrain::types::{Chassis, Vec3, WheelCommand, WheelContactSample};
use crate::dynamics::VehicleDynamics;
use crate::error::ConfigError;
use crate::input::DriverInput;
use crate::state::{Snapshot, VehicleSnapshot};
use crate::vehicle::{ChassisConfig, Vehicle};

const GROUP_GROUND: Group  = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

const WORLD_LIMIT: f32 = 1_000.0;
const FORWARD_IMPULSE_FACTOR: f32 = 0.5;

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,                  // gravity vector
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,          // for wheel rays
    pub vehicles: BTreeMap<String, Vehicle>,    // vehicle id → vehicle
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let gravity = vector![0.0, -9.81, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Static ground box, top surface at y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -1.0, 0.0])
            .build();
        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 1.0, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        info!(bodies = bodies.len(), colliders = colliders.len(), "ground inserted");

        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            vehicles: BTreeMap::new(),
        }
    }

    /// Spawn a four-wheel, rear-drive vehicle:
    /// - dynamic box chassis, x forward, y up
    /// - ray-cast wheels FL, FR, RL, RR (wheel ids 0..4)
    pub fn spawn_vehicle(
        &mut self,
        id: impl Into<String>,
        position: [f32; 3],
        config: ChassisConfig,
        params: TunableParameters,
    ) -> Result<RigidBodyHandle, ConfigError> {
        let id = id.into();
        let axles = config.rear_drive_axles();
        let dynamics = VehicleDynamics::new(params, axles.clone())?;

        let [hx, hy, hz] = config.chassis_half_extents;
        let [cx, cy, cz] = config.chassis_com_offset;
        let volume = 8.0 * hx * hy * hz;
        let density = config.mass / volume;     // ρ = m / V

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], position[1], position[2]])
            .linear_damping(config.linear_damping)
            .angular_damping(config.angular_damping)
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![cx, cy, cz])
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .density(density)
            .friction(0.0) // tires carry all grip
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        let tuning = WheelTuning {
            suspension_stiffness: config.suspension_stiffness,
            suspension_compression: config.suspension_compression,
            suspension_damping: config.suspension_damping,
            max_suspension_force: config.max_suspension_force,
            friction_slip: config.friction_slip,
            ..WheelTuning::default()
        };

        let mut controller = DynamicRayCastVehicleController::new(handle);
        let half_base = config.wheelbase * 0.5;
        let half_track = config.track_width * 0.5;
        for (i, axle) in axles.iter().enumerate() {
            let x = if i == 0 { half_base } else { -half_base };
            // left side is -z with x forward and y up
            let mounts = [(-half_track, axle.left_radius), (half_track, axle.right_radius)];
            for (z, radius) in mounts {
                controller.add_wheel(
                    point![x, -hy, z],
                    -Vector::y(),
                    Vector::z(),
                    config.suspension_rest_length,
                    radius,
                    &tuning,
                );
            }
        }

        let wheels = controller.wheels().len();
        self.vehicles.insert(
            id.clone(),
            Vehicle {
                body: handle,
                chassis: config,
                controller,
                dynamics,
                input: DriverInput::default(),
                wheel_rotation: vec![0.0; wheels],
                wheel_rpm: vec![0.0; wheels],
            },
        );

        info!(%id, ?position, ?handle, wheels, "spawned vehicle");
        Ok(handle)
    }

    /// Store the driver input; it is consumed on the next `step`.
    pub fn set_input(&mut self, id: &str, input: DriverInput) -> bool {
        match self.vehicles.get_mut(id) {
            Some(v) => {
                v.input = input;
                true
            }
            None => false,
        }
    }

    pub fn step(&mut self, dt: Real) {
        self.query_pipeline.update(&self.colliders);

        // 1) drivetrain + wheels
        for (id, vehicle) in self.vehicles.iter_mut() {
            let Some(body) = self.bodies.get_mut(vehicle.body) else {
                warn!(%id, "vehicle body missing, skipping");
                continue;
            };
            body.reset_forces(true);

            let mut chassis = RapierChassis {
                body,
                controller: &mut vehicle.controller,
                wheel_rpm: &vehicle.wheel_rpm,
                dt,
            };
            vehicle.dynamics.tick(dt, &vehicle.input, &mut chassis);

            let filter = QueryFilter::default()
                .exclude_rigid_body(vehicle.body)
                .groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND));
            vehicle.controller.update_vehicle(
                dt,
                &mut self.bodies,
                &self.colliders,
                &self.query_pipeline,
                filter,
            );

            for (i, wheel) in vehicle.controller.wheels().iter().enumerate() {
                let delta = wheel.rotation - vehicle.wheel_rotation[i];
                vehicle.wheel_rotation[i] = wheel.rotation;
                vehicle.wheel_rpm[i] = if dt > 0.0 { delta / dt * 60.0 / TAU } else { 0.0 };
            }
        }

        // 2) integrate
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // 3) prevent bodies from exploding to insane coordinates
        for (_, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = pos.iter().any(|c| !c.is_finite() || c.abs() > WORLD_LIMIT);
            if bad {
                let safe = vector![0.0, 1.0, 0.0];
                body.set_translation(safe, true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                warn!(?pos, "reset exploding body");
            }
        }
    }

    pub fn snapshot(&self, tick: u64) -> Snapshot {
        let vehicles = self
            .vehicles
            .iter()
            .filter_map(|(id, v)| {
                let body = self.bodies.get(v.body)?;
                let pos = body.translation();
                Some(VehicleSnapshot {
                    id: id.clone(),
                    position: [pos.x, pos.y, pos.z],
                    speed: body.linvel().norm(),
                    drivetrain: v.dynamics.snapshot(),
                })
            })
            .collect();
        Snapshot { tick, vehicles }
    }
}

/// `Chassis` view over one rapier body and its ray-cast wheels for the
/// duration of a drivetrain tick.
pub struct RapierChassis<'a> {
    pub body: &'a mut RigidBody,
    pub controller: &'a mut DynamicRayCastVehicleController,
    pub wheel_rpm: &'a [f32],
    pub dt: f32,
}

impl Chassis for RapierChassis<'_> {
    fn linear_velocity(&self) -> Vec3 {
        *self.body.linvel()
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.body.set_linvel(velocity, true);
    }

    fn heading(&self) -> f32 {
        let fwd = self.body.rotation() * Vector::x();
        let deg = (-fwd.z).atan2(fwd.x).to_degrees().rem_euclid(360.0);
        if deg >= 360.0 { 0.0 } else { deg }
    }

    fn up(&self) -> Vec3 {
        self.body.rotation() * Vector::y()
    }

    fn center_of_mass(&self) -> Point<Real> {
        *self.body.center_of_mass()
    }

    fn add_force(&mut self, force: Vec3) {
        self.body.add_force(force, true);
    }

    fn add_force_at_point(&mut self, force: Vec3, point: Point<Real>) {
        self.body.add_force_at_point(force, point, true);
    }

    // Slip is how far the last commanded drive impulse overshot the grip the
    // wheel could transmit (suspension load · friction_slip · dt). The
    // controller weighs forward impulse by half against that budget.
    fn wheel_sample(&self, wheel: usize) -> Option<WheelContactSample> {
        let w = self.controller.wheels().get(wheel)?;
        let grounded = w.raycast_info().is_in_contact;

        let grip = w.wheel_suspension_force * w.friction_slip * self.dt;
        let demand = (w.engine_force * self.dt * FORWARD_IMPULSE_FACTOR).abs();
        let forward_slip = if !grounded {
            0.0
        } else if grip > f32::EPSILON {
            (demand / grip - 1.0).max(0.0)
        } else if demand > f32::EPSILON {
            1.0
        } else {
            0.0
        };

        Some(WheelContactSample {
            rpm: self.wheel_rpm.get(wheel).copied().unwrap_or(0.0),
            forward_slip,
            grounded,
        })
    }

    fn apply_wheel_command(&mut self, wheel: usize, command: WheelCommand) {
        let dt = self.dt;
        let Some(w) = self.controller.wheels_mut().get_mut(wheel) else {
            return;
        };
        let radius = w.radius.max(f32::EPSILON);
        w.engine_force = command.motor_torque / radius;     // N
        w.brake = command.brake_torque / radius * dt;       // impulse, N·s
        w.steering = -command.steer_angle.to_radians();     // +steer is right turn
    }
}
