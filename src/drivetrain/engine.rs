//! Engine RPM: wheel speed through the drivetrain, smoothed toward a floor.

use crate::config::TunableParameters;
use crate::drivetrain::types::{lerp, WheelContactSample};

/// Below this the RPM snaps to zero.
pub const RPM_EPSILON: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Ignition {
    #[default]
    Off,
    On,
}

impl Ignition {
    pub fn is_on(self) -> bool {
        matches!(self, Ignition::On)
    }
}

/// Mean rotational speed of the sample axle, never negative.
/// A missing sample counts as a stopped wheel.
pub fn sample_axle_speed(
    left: Option<WheelContactSample>,
    right: Option<WheelContactSample>,
) -> f32 {
    let l = left.map_or(0.0, |s| s.rpm);
    let r = right.map_or(0.0, |s| s.rpm);
    ((l + r) * 0.5).max(0.0)
}

pub fn floor_rpm(params: &TunableParameters, ignition: Ignition) -> f32 {
    if ignition.is_on() { params.idle_rpm } else { 0.0 }
}

/// One smoothing step: `lerp(rpm, target, smoothing · dt)`.
pub fn step_rpm(
    params: &TunableParameters,
    rpm: f32,
    wheel_rpm: f32,
    gear_ratio: f32,
    ignition: Ignition,
    dt: f32,
) -> f32 {
    let target = (floor_rpm(params, ignition)
        + wheel_rpm * params.final_drive_ratio * gear_ratio)
        .max(0.0);

    let next = lerp(rpm, target, params.rpm_smoothing * dt).max(0.0);
    if next < RPM_EPSILON { 0.0 } else { next }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn sample(rpm: f32) -> Option<WheelContactSample> {
        Some(WheelContactSample { rpm, forward_slip: 0.0, grounded: true })
    }

    #[test]
    fn axle_speed_averages_and_clamps() {
        assert_eq!(sample_axle_speed(sample(100.0), sample(300.0)), 200.0);
        assert_eq!(sample_axle_speed(sample(-100.0), sample(-300.0)), 0.0);
        assert_eq!(sample_axle_speed(sample(100.0), None), 50.0);
    }

    #[test]
    fn smoothing_is_lerp_toward_target() {
        let p = TunableParameters::default();
        let next = step_rpm(&p, 0.0, 100.0, 2.0, Ignition::On, DT);
        let target = p.idle_rpm + 100.0 * p.final_drive_ratio * 2.0;
        let expected = target * p.rpm_smoothing * DT;
        assert!((next - expected).abs() < 1e-3);
    }

    #[test]
    fn floor_is_zero_with_ignition_off() {
        let p = TunableParameters::default();
        assert_eq!(floor_rpm(&p, Ignition::Off), 0.0);
        assert_eq!(floor_rpm(&p, Ignition::On), p.idle_rpm);
    }

    #[test]
    fn tiny_values_snap_to_zero() {
        let p = TunableParameters::default();
        assert_eq!(step_rpm(&p, 0.021, 0.0, 1.0, Ignition::Off, DT), 0.0);
    }

    #[test]
    fn negative_ratio_never_drives_rpm_negative() {
        let p = TunableParameters::default();
        let next = step_rpm(&p, 10.0, 500.0, -3.6, Ignition::Off, DT);
        assert!(next >= 0.0);
    }
}
