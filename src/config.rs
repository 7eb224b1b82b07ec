// ==============================================================================
// config.rs — TUNABLE PARAMETERS + KEY/VALUE OVERRIDES
// ------------------------------------------------------------------------------
// TunableParameters is built once: defaults, then an optional override text of
// `key = value` lines applied on top. The result is immutable for the lifetime
// of the vehicle.
//
// Override text rules:
// - blank lines and lines containing `#` or `//` are skipped
// - keys match field names 1:1, gear slots are `gear_ratio_1`..`gear_ratio_10`
// - unknown keys are ignored
// - the first malformed value aborts the whole override (nothing is applied)
// ==============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::drivetrain::curve::Curve;
use crate::error::ConfigError;

pub const MAX_GEAR_SLOTS: usize = 10;

const COMMENT_MARKERS: [&str; 2] = ["#", "//"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunableParameters {
    // --- Gearbox ---
    pub gear_ratios: Vec<f32>,      // 1-based in domain terms
    pub final_drive_ratio: f32,
    pub shift_delay: f32,           // s, min interval between automatic shifts
    pub shift_time: f32,            // s, ratio interpolation duration
    pub automatic: bool,            // false = manual requests only

    // --- Engine ---
    pub idle_rpm: f32,
    pub max_rpm: f32,
    pub rpm_smoothing: f32,         // 1/s
    pub rpm_sample_axle: usize,     // axle whose wheels drive the tach

    // --- Torque ---
    pub max_motor_torque: f32,      // N·m
    pub max_brake_torque: f32,      // N·m
    pub traction_control: f32,      // 0..1
    pub slip_limit: f32,

    // --- Steering ---
    pub max_steering_angle: f32,    // degrees
    pub auto_steer: f32,            // stability assist gain

    // --- Forces ---
    pub drag_coefficient: f32,
    pub downforce_coefficient: f32,
    pub tire_drag_coefficient: f32,

    // --- Curves (x normalized to [0,1]) ---
    pub torque_curve: Curve,        // torque fraction vs rpm/max_rpm
    pub shift_up_curve: Curve,      // rpm/max_rpm threshold vs throttle
    pub shift_down_curve: Curve,    // rpm/max_rpm threshold vs throttle
}

impl Default for TunableParameters {
    fn default() -> Self {
        Self {
            gear_ratios: vec![3.6, 2.19, 1.41, 1.0, 0.83, 0.7],
            final_drive_ratio: 3.4,
            shift_delay: 1.0,
            shift_time: 0.4,
            automatic: true,

            idle_rpm: 800.0,
            max_rpm: 7000.0,
            rpm_smoothing: 5.0,
            rpm_sample_axle: 1,

            max_motor_torque: 250.0,
            max_brake_torque: 1500.0,
            traction_control: 0.5,
            slip_limit: 0.3,

            max_steering_angle: 30.0,
            auto_steer: 0.5,

            drag_coefficient: 0.4,
            downforce_coefficient: 0.3,
            tire_drag_coefficient: 5.0,

            torque_curve: Curve::new(&[(0.0, 0.55), (0.45, 0.9), (0.75, 1.0), (1.0, 0.75)]),
            shift_up_curve: Curve::new(&[(0.0, 0.45), (1.0, 0.85)]),
            shift_down_curve: Curve::new(&[(0.0, 0.2), (1.0, 0.4)]),
        }
    }
}

impl TunableParameters {
    /// Defaults with the override file at `path` applied.
    pub fn from_override_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "applying parameter overrides");
        Self::default().with_overrides(&text)
    }

    /// A copy of `self` with every recognized `key = value` line applied.
    pub fn with_overrides(&self, text: &str) -> Result<Self, ConfigError> {
        let mut out = self.clone();
        let mut gear_slots: BTreeMap<usize, f32> = BTreeMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || COMMENT_MARKERS.iter().any(|m| line.contains(m)) {
                continue;
            }
            let line_no = idx + 1;
            let Some((key, value)) = line.split_once('=') else {
                debug!(line = line_no, "override line without `=` ignored");
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            let field: Option<&mut f32> = match key {
                "final_drive_ratio" => Some(&mut out.final_drive_ratio),
                "shift_delay" => Some(&mut out.shift_delay),
                "shift_time" => Some(&mut out.shift_time),
                "idle_rpm" => Some(&mut out.idle_rpm),
                "max_rpm" => Some(&mut out.max_rpm),
                "rpm_smoothing" => Some(&mut out.rpm_smoothing),
                "max_motor_torque" => Some(&mut out.max_motor_torque),
                "max_brake_torque" => Some(&mut out.max_brake_torque),
                "traction_control" => Some(&mut out.traction_control),
                "slip_limit" => Some(&mut out.slip_limit),
                "max_steering_angle" => Some(&mut out.max_steering_angle),
                "auto_steer" => Some(&mut out.auto_steer),
                "drag_coefficient" => Some(&mut out.drag_coefficient),
                "downforce_coefficient" => Some(&mut out.downforce_coefficient),
                "tire_drag_coefficient" => Some(&mut out.tire_drag_coefficient),
                _ => None,
            };

            if let Some(field) = field {
                *field = parse_number(line_no, key, value)?;
                continue;
            }

            match key {
                "automatic" => {
                    out.automatic = value.parse().map_err(|_| malformed(line_no, key, value))?;
                }
                "rpm_sample_axle" => {
                    out.rpm_sample_axle =
                        value.parse().map_err(|_| malformed(line_no, key, value))?;
                }
                _ => match gear_slot(key) {
                    Some(slot) => {
                        gear_slots.insert(slot, parse_number(line_no, key, value)?);
                    }
                    None => debug!(key, "unknown override key ignored"),
                },
            }
        }

        for (slot, ratio) in gear_slots {
            let len = out.gear_ratios.len();
            if slot <= len {
                out.gear_ratios[slot - 1] = ratio;
            } else if slot == len + 1 {
                out.gear_ratios.push(ratio);
            } else {
                return Err(ConfigError::GearSlotGap { slot, len });
            }
        }

        Ok(out)
    }

    /// Checks that do not depend on the axle layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let len = self.gear_ratios.len();
        if len == 0 || len > MAX_GEAR_SLOTS {
            return Err(ConfigError::GearTableSize { len, max: MAX_GEAR_SLOTS });
        }
        if !(0.0..=1.0).contains(&self.traction_control) {
            return Err(ConfigError::OutOfUnitRange {
                name: "traction_control",
                value: self.traction_control,
            });
        }
        Ok(())
    }
}

fn gear_slot(key: &str) -> Option<usize> {
    key.strip_prefix("gear_ratio_")?
        .parse::<usize>()
        .ok()
        .filter(|slot| (1..=MAX_GEAR_SLOTS).contains(slot))
}

fn parse_number(line: usize, key: &str, value: &str) -> Result<f32, ConfigError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(line, key, value))
}

fn malformed(line: usize, key: &str, value: &str) -> ConfigError {
    ConfigError::MalformedValue {
        line,
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_known_keys() {
        let text = "max_rpm = 8000\n  final_drive_ratio=4.1  \nautomatic = false\n";
        let p = TunableParameters::default().with_overrides(text).unwrap();
        assert_eq!(p.max_rpm, 8000.0);
        assert_eq!(p.final_drive_ratio, 4.1);
        assert!(!p.automatic);
    }

    #[test]
    fn skips_comments_blanks_and_unknown_keys() {
        let text = "\n# max_rpm = 1\nmax_rpm = 2 // trailing\nturbo_boost = 9\nno equals here\n";
        let p = TunableParameters::default().with_overrides(text).unwrap();
        assert_eq!(p, TunableParameters::default());
    }

    #[test]
    fn malformed_number_is_fatal() {
        let text = "max_rpm = 8000\nidle_rpm = 9OO\nslip_limit = 0.1\n";
        let err = TunableParameters::default().with_overrides(text).unwrap_err();
        match err {
            ConfigError::MalformedValue { line, key, .. } => {
                assert_eq!(line, 2);
                assert_eq!(key, "idle_rpm");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn non_finite_number_is_malformed() {
        let err = TunableParameters::default()
            .with_overrides("drag_coefficient = NaN")
            .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedValue { .. }));
    }

    #[test]
    fn gear_slots_replace_and_append() {
        let text = "gear_ratio_1 = 4.0\ngear_ratio_8 = 0.5\ngear_ratio_7 = 0.6";
        let p = TunableParameters::default().with_overrides(text).unwrap();
        assert_eq!(p.gear_ratios.len(), 8);
        assert_eq!(p.gear_ratios[0], 4.0);
        assert_eq!(p.gear_ratios[6], 0.6);
        assert_eq!(p.gear_ratios[7], 0.5);
    }

    #[test]
    fn gear_slot_gap_is_rejected() {
        let err = TunableParameters::default()
            .with_overrides("gear_ratio_9 = 0.5")
            .unwrap_err();
        assert!(matches!(err, ConfigError::GearSlotGap { slot: 9, len: 6 }));
    }

    #[test]
    fn gear_slot_beyond_ten_is_unknown() {
        let p = TunableParameters::default()
            .with_overrides("gear_ratio_11 = 0.5")
            .unwrap();
        assert_eq!(p.gear_ratios.len(), 6);
    }

    #[test]
    fn validate_rejects_empty_table() {
        let p = TunableParameters {
            gear_ratios: Vec::new(),
            ..TunableParameters::default()
        };
        assert!(matches!(p.validate(), Err(ConfigError::GearTableSize { len: 0, .. })));
    }
}
