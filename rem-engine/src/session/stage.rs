//! The eight wizard stages and their named forward transitions.
//!
//! Transition functions only describe the postcondition (next stage and the
//! measurement type that becomes active). Entry guards are checked by the
//! controller before a transition is taken.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::measurement::MeasurementType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Setup,
    ProbePosition,
    Reur,
    Reor,
    Rear,
    Reig,
    TargetCompare,
    Adjust,
}

impl Stage {
    pub const ORDER: [Stage; 8] = [
        Stage::Setup,
        Stage::ProbePosition,
        Stage::Reur,
        Stage::Reor,
        Stage::Rear,
        Stage::Reig,
        Stage::TargetCompare,
        Stage::Adjust,
    ];

    /// Zero-based position in the wizard.
    pub fn index(&self) -> usize {
        Stage::ORDER
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::Setup => None,
            Stage::ProbePosition => Some(Stage::Setup),
            Stage::Reur => Some(Stage::ProbePosition),
            Stage::Reor => Some(Stage::Reur),
            Stage::Rear => Some(Stage::Reor),
            Stage::Reig => Some(Stage::Rear),
            Stage::TargetCompare => Some(Stage::Reig),
            Stage::Adjust => Some(Stage::TargetCompare),
        }
    }

    /// The measurement a measurement stage collects.
    pub fn measurement_type(&self) -> Option<MeasurementType> {
        match self {
            Stage::Reur => Some(MeasurementType::Reur),
            Stage::Reor => Some(MeasurementType::Reor),
            Stage::Rear => Some(MeasurementType::Rear),
            Stage::Reig => Some(MeasurementType::Reig),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Setup => "Setup",
            Stage::ProbePosition => "Probe tube placement",
            Stage::Reur => "REUR - unaided response",
            Stage::Reor => "REOR - occluded response",
            Stage::Rear => "REAR - aided response",
            Stage::Reig => "REIG - insertion gain",
            Stage::TargetCompare => "Target comparison",
            Stage::Adjust => "Gain adjustment",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/8 {}", self.index() + 1, self.title())
    }
}

/// Result of a forward transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTransition {
    pub next: Stage,
    /// Measurement type that becomes active, when the transition sets one
    pub active_measurement: Option<MeasurementType>,
}

/// `Setup -> ProbePosition` once a patient and hearing aid are chosen.
pub fn confirm_setup() -> StageTransition {
    StageTransition {
        next: Stage::ProbePosition,
        active_measurement: None,
    }
}

/// `ProbePosition -> REUR` once the probe is correctly placed.
pub fn probe_verified() -> StageTransition {
    StageTransition {
        next: Stage::Reur,
        active_measurement: Some(MeasurementType::Reur),
    }
}

/// Automatic advance after the current stage's measurement completes.
///
/// `REUR -> REOR -> REAR -> REIG`; REIG and every other stage stay put.
pub fn measurement_completed(stage: Stage) -> Option<StageTransition> {
    let (next, active) = match stage {
        Stage::Reur => (Stage::Reor, MeasurementType::Reor),
        Stage::Reor => (Stage::Rear, MeasurementType::Rear),
        Stage::Rear => (Stage::Reig, MeasurementType::Reig),
        _ => return None,
    };
    Some(StageTransition {
        next,
        active_measurement: Some(active),
    })
}

/// `REIG -> TargetCompare`.
pub fn open_target_compare() -> StageTransition {
    StageTransition {
        next: Stage::TargetCompare,
        active_measurement: None,
    }
}

/// `TargetCompare -> Adjust`.
pub fn open_adjustment() -> StageTransition {
    StageTransition {
        next: Stage::Adjust,
        active_measurement: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_walks_back_to_setup() {
        let mut stage = Stage::Adjust;
        let mut visited = vec![stage];
        while let Some(prev) = stage.previous() {
            stage = prev;
            visited.push(stage);
        }
        visited.reverse();
        assert_eq!(visited, Stage::ORDER.to_vec());
    }

    #[test]
    fn test_measurement_chain() {
        let t = measurement_completed(Stage::Reur).unwrap();
        assert_eq!(t.next, Stage::Reor);
        assert_eq!(t.active_measurement, Some(MeasurementType::Reor));

        let t = measurement_completed(Stage::Reor).unwrap();
        assert_eq!(t.next, Stage::Rear);
        assert_eq!(t.active_measurement, Some(MeasurementType::Rear));

        let t = measurement_completed(Stage::Rear).unwrap();
        assert_eq!(t.next, Stage::Reig);
        assert_eq!(t.active_measurement, Some(MeasurementType::Reig));

        assert!(measurement_completed(Stage::Reig).is_none());
        assert!(measurement_completed(Stage::Setup).is_none());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Setup.to_string(), "1/8 Setup");
        assert_eq!(Stage::Adjust.to_string(), "8/8 Gain adjustment");
    }
}
