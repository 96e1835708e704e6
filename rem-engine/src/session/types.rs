use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::measurement::{Ear, MeasurementCurve, MeasurementType, TargetCurve, VentType};

/// One REM fitting session on a single ear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: u64,
    pub patient_id: String,
    pub hearing_aid_id: String,
    pub ear: Ear,
    pub vent_type: VentType,
    /// At most one curve per measurement type, oldest first
    pub curves: Vec<MeasurementCurve>,
    pub targets: Vec<TargetCurve>,
    pub completed: bool,
    pub accuracy: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: u64, patient_id: &str, hearing_aid_id: &str, ear: Ear) -> Self {
        Self {
            id,
            patient_id: patient_id.to_string(),
            hearing_aid_id: hearing_aid_id.to_string(),
            ear,
            vent_type: VentType::default(),
            curves: Vec::new(),
            targets: Vec::new(),
            completed: false,
            accuracy: None,
            created_at: Utc::now(),
        }
    }

    pub fn curve(&self, measurement_type: MeasurementType) -> Option<&MeasurementCurve> {
        self.curves
            .iter()
            .find(|c| c.measurement_type == measurement_type)
    }

    pub fn target(&self, target_type: MeasurementType) -> Option<&TargetCurve> {
        self.targets.iter().find(|t| t.target_type == target_type)
    }

    /// Drop any curve of the same type, then append the new one at the end.
    pub fn replace_curve(&mut self, curve: MeasurementCurve) {
        self.curves
            .retain(|c| c.measurement_type != curve.measurement_type);
        self.curves.push(curve);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_curve_appends_at_end() {
        let mut session = Session::new(1, "P001", "HA-RIC-60", Ear::Right);
        session.replace_curve(MeasurementCurve::from_gains(MeasurementType::Reur, [1.0; 11]));
        session.replace_curve(MeasurementCurve::from_gains(MeasurementType::Reor, [2.0; 11]));
        session.replace_curve(MeasurementCurve::from_gains(MeasurementType::Reur, [3.0; 11]));

        let order: Vec<MeasurementType> =
            session.curves.iter().map(|c| c.measurement_type).collect();
        assert_eq!(order, vec![MeasurementType::Reor, MeasurementType::Reur]);
        assert_eq!(
            session.curve(MeasurementType::Reur).unwrap().gain_at(125),
            Some(3.0)
        );
    }
}
