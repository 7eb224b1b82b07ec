// ==============================================================================
// traction.rs — DRIVETRAIN TORQUE + TRACTION CONTROL
// ==============================================================================
// torque = torque_curve(rpm / max_rpm) · gear_ratio · final_drive · ceiling
//
// The ceiling is a discrete integral controller: every grounded motor wheel
// nudges it down by 10·tc when slipping past the limit, up by the same step
// otherwise. Several wheels may move it in the same tick.
//
// Motor torque is shared evenly over the wheels of motor axles. Brake torque
// goes to every axle scaled by its bias. Both are written in the same tick;
// holding brake and throttle together applies both.
// ==============================================================================

use serde::Serialize;
use tracing::trace;

use crate::config::TunableParameters;
use crate::drivetrain::engine::Ignition;
use crate::vehicle::AxleConfig;

const TC_STEP_SCALE: f32 = 10.0;

/// Total drivetrain torque; zero when the rpm ratio is undefined.
pub fn drive_torque(params: &TunableParameters, rpm: f32, gear_ratio: f32, ceiling: f32) -> f32 {
    let rpm_ratio = rpm / params.max_rpm;
    if rpm_ratio.is_nan() {
        return 0.0;
    }
    let torque = params.torque_curve.evaluate(rpm_ratio)
        * gear_ratio
        * params.final_drive_ratio
        * ceiling;
    if torque.is_finite() { torque } else { 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TractionControl {
    ceiling: f32,
}

impl TractionControl {
    pub fn new(params: &TunableParameters) -> Self {
        let ceiling = params.max_motor_torque * (1.0 - params.traction_control);
        Self {
            ceiling: ceiling.clamp(0.0, params.max_motor_torque.max(0.0)),
        }
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    pub fn step_size(params: &TunableParameters) -> f32 {
        TC_STEP_SCALE * params.traction_control
    }

    /// One wheel's contribution to the feedback loop.
    pub fn feedback(&mut self, params: &TunableParameters, forward_slip: f32) {
        let step = Self::step_size(params);
        let max = params.max_motor_torque.max(0.0);
        self.ceiling = if forward_slip >= params.slip_limit {
            (self.ceiling - step).max(0.0)
        } else {
            (self.ceiling + step).min(max)
        };
        trace!(forward_slip, ceiling = self.ceiling, "traction feedback");
    }
}

/// Per-wheel torques for one axle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxleTorque {
    pub motor: f32,
    pub brake: f32,
}

/// Split drive and brake torque over the axles, in axle order.
pub fn distribute(
    params: &TunableParameters,
    axles: &[AxleConfig],
    torque: f32,
    accel: f32,
    brake: f32,
    ignition: Ignition,
) -> Vec<AxleTorque> {
    let motor_wheels = 2 * axles.iter().filter(|a| a.motor).count();
    let accel = accel.clamp(0.0, 1.0);
    let brake = brake.clamp(0.0, 1.0);

    let per_wheel = if ignition.is_on() && motor_wheels > 0 {
        accel * torque / motor_wheels as f32
    } else {
        0.0
    };

    axles
        .iter()
        .map(|axle| AxleTorque {
            motor: if axle.motor { per_wheel } else { 0.0 },
            brake: params.max_brake_torque * brake * axle.brake_bias,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::curve::Curve;

    fn params() -> TunableParameters {
        TunableParameters {
            torque_curve: Curve::constant(1.0),
            final_drive_ratio: 2.0,
            max_motor_torque: 100.0,
            max_brake_torque: 1000.0,
            traction_control: 0.5,
            slip_limit: 0.3,
            ..TunableParameters::default()
        }
    }

    fn axles() -> Vec<AxleConfig> {
        vec![
            AxleConfig::new(0, 1, 0.35).with_steering().with_brake_bias(0.6),
            AxleConfig::new(2, 3, 0.35).with_motor().with_brake_bias(0.4),
        ]
    }

    #[test]
    fn torque_scales_with_ratio_and_ceiling() {
        let t = drive_torque(&params(), 3500.0, 3.0, 50.0);
        assert!((t - 300.0).abs() < 1e-3);
    }

    #[test]
    fn nan_ratio_gives_zero_torque() {
        let p = TunableParameters { max_rpm: 0.0, ..params() };
        assert_eq!(drive_torque(&p, 0.0, 3.0, 50.0), 0.0);
    }

    #[test]
    fn ceiling_starts_reduced_by_tc() {
        assert_eq!(TractionControl::new(&params()).ceiling(), 50.0);
    }

    #[test]
    fn feedback_steps_and_saturates() {
        let p = params();
        let mut tc = TractionControl::new(&p);
        tc.feedback(&p, 0.5);
        assert_eq!(tc.ceiling(), 45.0);
        for _ in 0..100 {
            tc.feedback(&p, 0.0);
        }
        assert_eq!(tc.ceiling(), 100.0);
        for _ in 0..100 {
            tc.feedback(&p, 1.0);
        }
        assert_eq!(tc.ceiling(), 0.0);
    }

    #[test]
    fn slip_exactly_at_limit_counts_as_slipping() {
        let p = params();
        let mut tc = TractionControl::new(&p);
        tc.feedback(&p, 0.3);
        assert_eq!(tc.ceiling(), 45.0);
    }

    #[test]
    fn motor_torque_only_on_motor_axles() {
        let out = distribute(&params(), &axles(), 400.0, 0.5, 0.0, Ignition::On);
        assert_eq!(out[0].motor, 0.0);
        assert_eq!(out[1].motor, 100.0);
    }

    #[test]
    fn ignition_off_cuts_motor_not_brake() {
        let out = distribute(&params(), &axles(), 400.0, 1.0, 1.0, Ignition::Off);
        assert_eq!(out[1].motor, 0.0);
        assert_eq!(out[0].brake, 600.0);
        assert_eq!(out[1].brake, 400.0);
    }

    #[test]
    fn brake_and_accel_apply_together() {
        let out = distribute(&params(), &axles(), 400.0, 1.0, 0.5, Ignition::On);
        assert_eq!(out[1].motor, 200.0);
        assert_eq!(out[1].brake, 200.0);
    }
}
