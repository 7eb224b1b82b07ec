//! Error types for configuration and vehicle construction.
//!
//! The per-tick path has no error type: every numeric edge case there is
//! clamped. Only building a vehicle can fail.

use std::path::PathBuf;

/// Configuration and construction errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A recognized key carried a value that is not a finite number (or bool
    /// / index, for the keys that take those).
    #[error("line {line}: value `{value}` for `{key}` is malformed")]
    MalformedValue {
        /// 1-based line number in the override text
        line: usize,
        key: String,
        value: String,
    },

    /// `gear_ratio_N` skipped over an unset slot.
    #[error("gear_ratio_{slot} leaves a gap after {len} configured gears")]
    GearSlotGap { slot: usize, len: usize },

    #[error("gear ratio table must hold 1..={max} entries, got {len}")]
    GearTableSize { len: usize, max: usize },

    #[error("rpm sample axle {index} is out of range for {count} axles")]
    RpmAxleOutOfRange { index: usize, count: usize },

    #[error("axle {axle} uses wheel {wheel} on both sides")]
    DuplicateWheel { axle: usize, wheel: usize },

    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f32 },

    #[error("failed to read config overrides from {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
