//! Probe-tube insertion depth classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RemError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbePosition {
    /// Default before any depth check. Never produced by `classify`.
    #[default]
    NotInserted,
    TooShallow,
    Correct,
    TooDeep,
}

impl fmt::Display for ProbePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbePosition::NotInserted => "not inserted",
            ProbePosition::TooShallow => "too shallow",
            ProbePosition::Correct => "correct",
            ProbePosition::TooDeep => "too deep",
        };
        f.write_str(s)
    }
}

/// Acceptable insertion window, in millimetres from the ear canal entrance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeThresholds {
    pub min_depth_mm: f32,
    pub max_depth_mm: f32,
    /// Deepest reading the instrument can report
    pub instrument_max_mm: f32,
}

impl Default for ProbeThresholds {
    fn default() -> Self {
        Self {
            min_depth_mm: 20.0,
            max_depth_mm: 30.0,
            instrument_max_mm: 50.0,
        }
    }
}

impl ProbeThresholds {
    /// Classify a depth reading. Both window bounds count as correct.
    pub fn classify(&self, depth_mm: f32) -> Result<ProbePosition, RemError> {
        if !depth_mm.is_finite() || depth_mm < 0.0 || depth_mm > self.instrument_max_mm {
            return Err(RemError::Validation(format!(
                "Probe depth {} mm is outside the instrument range 0-{} mm",
                depth_mm, self.instrument_max_mm
            )));
        }

        let position = if depth_mm < self.min_depth_mm {
            ProbePosition::TooShallow
        } else if depth_mm > self.max_depth_mm {
            ProbePosition::TooDeep
        } else {
            ProbePosition::Correct
        };
        Ok(position)
    }
}
