//! Driver input: the per-tick record the dynamics core consumes, plus the
//! sources that produce it.

use serde::{Deserialize, Serialize};

use crate::drivetrain::engine::Ignition;
use crate::drivetrain::gearbox::ShiftRequest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverInput {
    pub steer: f32,                     // -1.0 (full left) .. 1.0 (full right)
    pub accel: f32,                     // 0.0 .. 1.0
    pub brake: f32,                     // 0.0 .. 1.0
    pub handbrake: bool,
    pub ignition: Option<Ignition>,     // None keeps the current state
    pub shift: Option<ShiftRequest>,
    pub emergency_stop: bool,           // forces handbrake + ignition off
}

impl DriverInput {
    /// Clamp axes into range; NaN reads as released.
    pub fn sanitized(mut self) -> Self {
        fn axis(v: f32, lo: f32) -> f32 {
            if v.is_nan() { 0.0 } else { v.clamp(lo, 1.0) }
        }
        self.steer = axis(self.steer, -1.0);
        self.accel = axis(self.accel, 0.0);
        self.brake = axis(self.brake, 0.0);
        self
    }
}

/// Anything that can be polled once per tick for driver input.
pub trait InputSource {
    fn poll(&mut self, time: f32) -> DriverInput;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptPhase {
    pub until: f32, // seconds since start
    pub input: DriverInput,
}

/// Time-scripted driver used by the simulation binary.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    phases: Vec<ScriptPhase>,
}

impl ScriptedDriver {
    pub fn new(mut phases: Vec<ScriptPhase>) -> Self {
        phases.sort_by(|a, b| a.until.total_cmp(&b.until));
        Self { phases }
    }

    /// Start, launch, run up through the gears, turn, brake, park.
    pub fn demo() -> Self {
        let on = Some(Ignition::On);
        Self::new(vec![
            ScriptPhase { until: 0.5, input: DriverInput { ignition: on, ..Default::default() } },
            ScriptPhase { until: 12.0, input: DriverInput { accel: 1.0, ..Default::default() } },
            ScriptPhase {
                until: 15.0,
                input: DriverInput { accel: 0.6, steer: 0.4, ..Default::default() },
            },
            ScriptPhase { until: 18.0, input: DriverInput { brake: 0.8, ..Default::default() } },
            ScriptPhase {
                until: 19.0,
                input: DriverInput { handbrake: true, shift: Some(ShiftRequest::First), ..Default::default() },
            },
            ScriptPhase {
                until: 20.0,
                input: DriverInput { handbrake: true, ignition: Some(Ignition::Off), ..Default::default() },
            },
        ])
    }

    pub fn duration(&self) -> f32 {
        self.phases.last().map_or(0.0, |p| p.until)
    }
}

impl InputSource for ScriptedDriver {
    fn poll(&mut self, time: f32) -> DriverInput {
        self.phases
            .iter()
            .find(|p| time < p.until)
            .map(|p| p.input)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_and_zeroes_nan() {
        let i = DriverInput { steer: -3.0, accel: f32::NAN, brake: 2.0, ..Default::default() }
            .sanitized();
        assert_eq!(i.steer, -1.0);
        assert_eq!(i.accel, 0.0);
        assert_eq!(i.brake, 1.0);
    }

    #[test]
    fn script_follows_phases() {
        let mut d = ScriptedDriver::demo();
        assert_eq!(d.poll(0.0).ignition, Some(Ignition::On));
        assert_eq!(d.poll(5.0).accel, 1.0);
        assert!(d.poll(18.5).handbrake);
        assert_eq!(d.poll(100.0), DriverInput::default());
        assert_eq!(d.duration(), 20.0);
    }
}
