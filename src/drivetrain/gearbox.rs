// ==============================================================================
// gearbox.rs — GEAR SHIFT STATE MACHINE (MANUAL + AUTOMATIC)
// ==============================================================================
// States:
//   Idle
//   Shifting { from, to, started_at }   -- at most one in flight
//
// The selected gear is a single tagged value (Forward(n) | Reverse), so a
// "reverse while in 3rd" combination cannot be built. The effective gear
// `position` is fractional while a shift interpolates:
//
//   position = lerp(from, to, (now - started_at) / shift_time)
//
// and is clamped to [1, top] where top = max(1, ratio_count - 1). The last
// entry of the ratio table is therefore never reached.
//
// Ratio lookup interpolates between the two table entries that bracket
// `position`; Reverse uses the negated first entry.
// ==============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TunableParameters;
use crate::drivetrain::types::{lerp, lerp64};

/// Automatic upshifts out of first need at least this road speed (units/s),
/// so a wheel spinning from a standstill does not climb the box.
pub const UPSHIFT_MIN_SPEED: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gear {
    Reverse,
    Forward(u8),
}

impl Gear {
    /// Signed gear number, reverse = -1.
    pub fn number(self) -> i32 {
        match self {
            Gear::Reverse => -1,
            Gear::Forward(n) => i32::from(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShiftPhase {
    Idle,
    Shifting { from: u8, to: u8, started_at: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftRequest {
    Up,
    Down,
    First,
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gearbox {
    gear: Gear,
    phase: ShiftPhase,
    position: f32,
    last_shift_at: f64,
    top: u8,
}

impl Gearbox {
    pub fn new(ratio_count: usize) -> Self {
        let top = ratio_count.saturating_sub(1).clamp(1, usize::from(u8::MAX));
        Self {
            gear: Gear::Forward(1),
            phase: ShiftPhase::Idle,
            position: 1.0,
            last_shift_at: 0.0,
            top: top as u8,
        }
    }

    pub fn gear(&self) -> Gear {
        self.gear
    }

    pub fn phase(&self) -> ShiftPhase {
        self.phase
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn last_shift_at(&self) -> f64 {
        self.last_shift_at
    }

    pub fn top_gear(&self) -> u8 {
        self.top
    }

    pub fn is_shifting(&self) -> bool {
        matches!(self.phase, ShiftPhase::Shifting { .. })
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self.gear, Gear::Reverse)
    }

    /// The gear the box is currently in, rounded.
    pub fn current(&self) -> u8 {
        self.position.round().max(1.0) as u8
    }

    /// Apply a driver/automatic request. Returns whether anything changed.
    pub fn request(&mut self, request: ShiftRequest, now: f64) -> bool {
        match request {
            ShiftRequest::Up => self.shift_up(now),
            ShiftRequest::Down => self.shift_down(now),
            ShiftRequest::First => self.shift_to_first(now),
            ShiftRequest::Reverse => self.shift_to_reverse(now),
        }
    }

    fn shift_up(&mut self, now: f64) -> bool {
        match self.gear {
            Gear::Reverse => {
                // straight into first, no ratio blend
                self.gear = Gear::Forward(1);
                self.phase = ShiftPhase::Idle;
                self.position = 1.0;
                self.last_shift_at = now;
                debug!("reverse -> 1");
                true
            }
            Gear::Forward(_) if self.is_shifting() => {
                debug!("upshift rejected, shift in flight");
                false
            }
            Gear::Forward(_) => {
                let from = self.current();
                self.begin(from, from.saturating_add(1).min(self.top), now);
                true
            }
        }
    }

    fn shift_down(&mut self, now: f64) -> bool {
        match self.gear {
            Gear::Reverse => false,
            Gear::Forward(_) if self.is_shifting() => {
                debug!("downshift rejected, shift in flight");
                false
            }
            Gear::Forward(_) if self.current() == 1 => self.shift_to_reverse(now),
            Gear::Forward(_) => {
                let from = self.current();
                self.begin(from, from - 1, now);
                true
            }
        }
    }

    fn shift_to_first(&mut self, now: f64) -> bool {
        match self.gear {
            Gear::Forward(1) if self.phase == ShiftPhase::Idle && self.position == 1.0 => false,
            Gear::Reverse => {
                self.gear = Gear::Forward(1);
                self.phase = ShiftPhase::Idle;
                self.position = 1.0;
                self.last_shift_at = now;
                debug!("reverse -> 1");
                true
            }
            Gear::Forward(_) => {
                let from = self.current();
                self.begin(from, 1, now);
                true
            }
        }
    }

    fn shift_to_reverse(&mut self, now: f64) -> bool {
        self.gear = Gear::Reverse;
        self.phase = ShiftPhase::Idle;
        self.position = 1.0;
        self.last_shift_at = now;
        debug!("-> reverse");
        true
    }

    fn begin(&mut self, from: u8, to: u8, now: f64) {
        self.gear = Gear::Forward(to);
        self.phase = ShiftPhase::Shifting { from, to, started_at: now };
        self.last_shift_at = now;
        debug!(from, to, "shift started");
    }

    /// Decide an automatic shift. The caller gates on ignition and mode.
    pub fn automatic_request(
        &self,
        params: &TunableParameters,
        now: f64,
        rpm: f32,
        throttle: f32,
        speed: f32,
    ) -> Option<ShiftRequest> {
        if self.is_reverse() || self.is_shifting() {
            return None;
        }
        if now - self.last_shift_at < f64::from(params.shift_delay) {
            return None;
        }

        let rpm_ratio = rpm / params.max_rpm;
        let gear = self.current();

        if rpm_ratio > params.shift_up_curve.evaluate(throttle)
            && (gear > 1 || speed > UPSHIFT_MIN_SPEED)
        {
            Some(ShiftRequest::Up)
        } else if rpm_ratio < params.shift_down_curve.evaluate(throttle) && gear > 1 {
            Some(ShiftRequest::Down)
        } else {
            None
        }
    }

    /// Advance an in-flight shift and clamp the position.
    pub fn update(&mut self, params: &TunableParameters, now: f64) {
        if let ShiftPhase::Shifting { from, to, started_at } = self.phase {
            let progress = if params.shift_time > 0.0 {
                ((now - started_at) / f64::from(params.shift_time)).clamp(0.0, 1.0)
            } else {
                1.0
            };
            self.position = lerp64(f64::from(from), f64::from(to), progress) as f32;

            if progress >= 1.0 {
                self.phase = ShiftPhase::Idle;
                self.position = self.position.clamp(1.0, f32::from(self.top));
                self.gear = Gear::Forward(self.current());
                debug!(gear = self.current(), "shift complete");
            }
        }

        if self.is_reverse() {
            self.position = 1.0;
        }
        self.position = self.position.clamp(1.0, f32::from(self.top));
    }

    /// Effective ratio for the current position.
    pub fn ratio(&self, ratios: &[f32]) -> f32 {
        let Some(&first) = ratios.first() else {
            return 0.0;
        };
        if self.is_reverse() {
            return -first;
        }

        // 1-based gear `lower` is 0-based entry `lower - 1`
        let lower = self.position.floor().max(1.0) as usize;
        let frac = self.position - lower as f32;
        let low = ratios.get(lower - 1).copied().unwrap_or(first);
        let high = ratios.get(lower).copied().unwrap_or(low);
        lerp(low, high, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TunableParameters {
        TunableParameters {
            gear_ratios: vec![4.0, 3.0, 2.0, 1.0],
            shift_time: 0.5,
            shift_delay: 1.0,
            ..TunableParameters::default()
        }
    }

    fn settle(gb: &mut Gearbox, p: &TunableParameters, now: f64) {
        gb.update(p, now + f64::from(p.shift_time) + 1e-6);
    }

    #[test]
    fn top_gear_leaves_last_slot_unused() {
        assert_eq!(Gearbox::new(4).top_gear(), 3);
        assert_eq!(Gearbox::new(1).top_gear(), 1);
    }

    #[test]
    fn shift_up_interpolates_position() {
        let p = params();
        let mut gb = Gearbox::new(4);
        assert!(gb.request(ShiftRequest::Up, 2.0));
        assert_eq!(gb.gear(), Gear::Forward(2));
        gb.update(&p, 2.25);
        assert!((gb.position() - 1.5).abs() < 1e-6);
        assert!((gb.ratio(&p.gear_ratios) - 3.5).abs() < 1e-6);
        gb.update(&p, 2.5);
        assert_eq!(gb.position(), 2.0);
        assert_eq!(gb.phase(), ShiftPhase::Idle);
    }

    #[test]
    fn overlapping_shift_is_rejected() {
        let mut gb = Gearbox::new(4);
        assert!(gb.request(ShiftRequest::Up, 0.0));
        assert!(!gb.request(ShiftRequest::Up, 0.1));
        assert!(!gb.request(ShiftRequest::Down, 0.1));
        assert_eq!(gb.phase(), ShiftPhase::Shifting { from: 1, to: 2, started_at: 0.0 });
    }

    #[test]
    fn down_from_first_engages_reverse() {
        let p = params();
        let mut gb = Gearbox::new(4);
        assert!(gb.request(ShiftRequest::Down, 1.0));
        assert!(gb.is_reverse());
        assert_eq!(gb.ratio(&p.gear_ratios), -4.0);
        assert_eq!(gb.gear().number(), -1);
        // down again stays in reverse
        assert!(!gb.request(ShiftRequest::Down, 1.5));
    }

    #[test]
    fn up_from_reverse_is_immediate_first() {
        let mut gb = Gearbox::new(4);
        gb.request(ShiftRequest::Reverse, 0.0);
        assert!(gb.request(ShiftRequest::Up, 0.2));
        assert_eq!(gb.gear(), Gear::Forward(1));
        assert_eq!(gb.phase(), ShiftPhase::Idle);
        assert_eq!(gb.last_shift_at(), 0.2);
    }

    #[test]
    fn shift_to_first_is_idempotent() {
        let mut gb = Gearbox::new(4);
        let before = gb.clone();
        assert!(!gb.request(ShiftRequest::First, 5.0));
        assert_eq!(gb, before);
    }

    #[test]
    fn shift_to_first_from_third() {
        let p = params();
        let mut gb = Gearbox::new(4);
        gb.request(ShiftRequest::Up, 0.0);
        settle(&mut gb, &p, 0.0);
        gb.request(ShiftRequest::Up, 1.0);
        settle(&mut gb, &p, 1.0);
        assert_eq!(gb.current(), 3);

        assert!(gb.request(ShiftRequest::First, 3.0));
        assert_eq!(gb.last_shift_at(), 3.0);
        settle(&mut gb, &p, 3.0);
        assert_eq!(gb.gear(), Gear::Forward(1));
        assert_eq!(gb.position(), 1.0);
    }

    #[test]
    fn shift_past_top_is_clamped() {
        let p = params();
        let mut gb = Gearbox::new(4);
        for i in 0..5 {
            let now = f64::from(i) * 2.0;
            gb.request(ShiftRequest::Up, now);
            gb.update(&p, now + 0.3);
            assert!(gb.position() <= 3.0);
            settle(&mut gb, &p, now);
        }
        assert_eq!(gb.gear(), Gear::Forward(3));
        assert_eq!(gb.ratio(&p.gear_ratios), 2.0);
    }

    #[test]
    fn zero_shift_time_completes_at_once() {
        let p = TunableParameters { shift_time: 0.0, ..params() };
        let mut gb = Gearbox::new(4);
        gb.request(ShiftRequest::Up, 0.0);
        gb.update(&p, 0.0);
        assert_eq!(gb.position(), 2.0);
        assert!(!gb.is_shifting());
    }

    #[test]
    fn automatic_respects_delay_and_speed() {
        let p = params();
        let gb = Gearbox::new(4);
        let hot = p.max_rpm * 0.95;
        // too early
        assert_eq!(gb.automatic_request(&p, 0.5, hot, 1.0, 30.0), None);
        // first gear, standing start
        assert_eq!(gb.automatic_request(&p, 2.0, hot, 1.0, 5.0), None);
        assert_eq!(gb.automatic_request(&p, 2.0, hot, 1.0, 20.0), Some(ShiftRequest::Up));
    }

    #[test]
    fn automatic_downshift_needs_gear_above_first() {
        let p = params();
        let mut gb = Gearbox::new(4);
        assert_eq!(gb.automatic_request(&p, 5.0, 0.0, 0.0, 0.0), None);
        gb.request(ShiftRequest::Up, 0.0);
        settle(&mut gb, &p, 0.0);
        assert_eq!(gb.automatic_request(&p, 5.0, 0.0, 0.0, 0.0), Some(ShiftRequest::Down));
    }

    #[test]
    fn automatic_ignores_nan_ratio() {
        let p = TunableParameters { max_rpm: 0.0, ..params() };
        let gb = Gearbox::new(4);
        assert_eq!(gb.automatic_request(&p, 5.0, 0.0, 1.0, 30.0), None);
    }
}
