//! Normalized keyframe curve for torque and shift-point lookups.

use serde::{Deserialize, Serialize};

use crate::drivetrain::types::lerp;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

/// Piecewise-linear curve over sorted keyframes.
///
/// Inputs outside the keyed range hold the first/last value. An empty curve
/// evaluates to `0.0`; a NaN input evaluates to NaN so callers can detect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl Curve {
    /// Build from `(time, value)` pairs; keys are sorted by time.
    pub fn new(points: &[(f32, f32)]) -> Self {
        let mut keys: Vec<Keyframe> = points
            .iter()
            .map(|&(time, value)| Keyframe { time, value })
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    pub fn constant(value: f32) -> Self {
        Self::new(&[(0.0, value)])
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        if t.is_nan() {
            return f32::NAN;
        }
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // first key with time > t; t is strictly inside the range so hi ≥ 1
        let hi = self.keys.partition_point(|k| k.time <= t);
        let (a, b) = (self.keys[hi - 1], self.keys[hi]);
        let span = b.time - a.time;
        if span <= f32::EPSILON {
            return b.value;
        }
        lerp(a.value, b.value, (t - a.time) / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_keys() {
        let c = Curve::new(&[(0.0, 0.0), (1.0, 10.0)]);
        assert!((c.evaluate(0.25) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn holds_endpoints() {
        let c = Curve::new(&[(0.2, 1.0), (0.8, 3.0)]);
        assert_eq!(c.evaluate(-5.0), 1.0);
        assert_eq!(c.evaluate(5.0), 3.0);
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let c = Curve::new(&[(1.0, 2.0), (0.0, 0.0), (0.5, 1.5)]);
        assert!((c.evaluate(0.75) - 1.75).abs() < 1e-6);
    }

    #[test]
    fn empty_and_nan() {
        assert_eq!(Curve::new(&[]).evaluate(0.5), 0.0);
        assert!(Curve::constant(1.0).evaluate(f32::NAN).is_nan());
    }
}
