//! Discrete stimulus input levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RemError;

/// Valid input levels in dB SPL, ascending.
pub const INPUT_LEVELS: [u8; 9] = [50, 55, 60, 65, 70, 75, 80, 85, 90];

/// An input level guaranteed to be one of `INPUT_LEVELS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct InputLevel(u8);

impl InputLevel {
    pub fn db(&self) -> u8 {
        self.0
    }
}

impl Default for InputLevel {
    fn default() -> Self {
        InputLevel(65)
    }
}

impl TryFrom<u8> for InputLevel {
    type Error = RemError;

    fn try_from(db: u8) -> Result<Self, Self::Error> {
        if INPUT_LEVELS.contains(&db) {
            Ok(InputLevel(db))
        } else {
            Err(RemError::Validation(format!(
                "Input level {} dB SPL is not one of {:?}",
                db, INPUT_LEVELS
            )))
        }
    }
}

impl From<InputLevel> for u8 {
    fn from(level: InputLevel) -> Self {
        level.0
    }
}

impl fmt::Display for InputLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dB SPL", self.0)
    }
}

/// Snap a raw slider value to the nearest valid level.
///
/// Candidates are scanned in ascending order and only a strictly smaller
/// distance replaces the current best, so an exact midpoint resolves to the
/// lower level. Non-finite input resolves to the first level.
pub fn snap_level(raw: f32) -> InputLevel {
    let mut best = INPUT_LEVELS[0];
    let mut best_distance = (raw - best as f32).abs();

    for &candidate in &INPUT_LEVELS[1..] {
        let distance = (raw - candidate as f32).abs();
        if distance < best_distance {
            best = candidate;
            best_distance = distance;
        }
    }

    InputLevel(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_nearest() {
        assert_eq!(snap_level(62.0).db(), 60);
        assert_eq!(snap_level(63.0).db(), 65);
        assert_eq!(snap_level(71.2).db(), 70);
    }

    #[test]
    fn test_snap_midpoint_prefers_lower() {
        assert_eq!(snap_level(62.5).db(), 60);
        assert_eq!(snap_level(87.5).db(), 85);
        assert_eq!(snap_level(52.5).db(), 50);
    }

    #[test]
    fn test_snap_out_of_range() {
        assert_eq!(snap_level(0.0).db(), 50);
        assert_eq!(snap_level(-20.0).db(), 50);
        assert_eq!(snap_level(140.0).db(), 90);
    }

    #[test]
    fn test_snap_non_finite() {
        assert_eq!(snap_level(f32::NAN).db(), 50);
        assert_eq!(snap_level(f32::INFINITY).db(), 50);
    }

    #[test]
    fn test_snap_always_valid() {
        let mut raw = -10.0_f32;
        while raw <= 110.0 {
            let level = snap_level(raw);
            assert!(
                INPUT_LEVELS.contains(&level.db()),
                "{} snapped to invalid level {}",
                raw,
                level.db()
            );
            raw += 0.25;
        }
    }

    #[test]
    fn test_try_from_rejects_off_grid() {
        assert!(InputLevel::try_from(65).is_ok());
        assert!(InputLevel::try_from(62).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let level: InputLevel = serde_json::from_str("70").unwrap();
        assert_eq!(level.db(), 70);
        assert!(serde_json::from_str::<InputLevel>("71").is_err());
    }
}
