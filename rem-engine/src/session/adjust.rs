//! Working copy of the aided response used while fine-tuning gain.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::measurement::{CurvePoint, MeasurementCurve, MeasurementType};

pub const MIN_GAIN_DB: f32 = 0.0;
pub const MAX_GAIN_DB: f32 = 80.0;

/// Snapshot of the operator's adjusted REAR curve.
///
/// Snapshots are never edited in place: every adjustment derives a new one
/// from the latest, so repeated increments compose without losing updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustableCurve {
    points: Vec<CurvePoint>,
    updated_at: DateTime<Utc>,
}

impl AdjustableCurve {
    /// Start from a measured curve, bringing every point into the adjustable range.
    pub fn from_curve(curve: &MeasurementCurve) -> Self {
        let points = curve
            .points
            .iter()
            .map(|p| CurvePoint {
                frequency: p.frequency,
                gain: p.gain.clamp(MIN_GAIN_DB, MAX_GAIN_DB),
            })
            .collect();
        Self {
            points,
            updated_at: Utc::now(),
        }
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn gain_at(&self, frequency: u32) -> Option<f32> {
        crate::measurement::gain_at(&self.points, frequency)
    }

    /// Derive a snapshot with `delta` dB applied at exactly `frequency`.
    ///
    /// Returns `None` when the frequency is not on the table or the delta is
    /// not a finite number.
    pub fn adjusted(&self, frequency: u32, delta: f32) -> Option<AdjustableCurve> {
        if !delta.is_finite() || !self.points.iter().any(|p| p.frequency == frequency) {
            return None;
        }

        let points = self
            .points
            .iter()
            .map(|p| {
                if p.frequency == frequency {
                    CurvePoint {
                        frequency: p.frequency,
                        gain: (p.gain + delta).clamp(MIN_GAIN_DB, MAX_GAIN_DB),
                    }
                } else {
                    *p
                }
            })
            .collect();

        Some(AdjustableCurve {
            points,
            updated_at: Utc::now(),
        })
    }

    /// Convert into the REAR curve stored on completion.
    pub fn into_measurement(self) -> MeasurementCurve {
        MeasurementCurve {
            measurement_type: MeasurementType::Rear,
            points: self.points,
            created_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::FREQUENCIES;

    fn rear(gain: f32) -> MeasurementCurve {
        MeasurementCurve::from_gains(MeasurementType::Rear, [gain; 11])
    }

    #[test]
    fn test_adjust_single_frequency() {
        let curve = AdjustableCurve::from_curve(&rear(20.0));
        let adjusted = curve.adjusted(2000, 3.0).unwrap();

        assert_eq!(adjusted.gain_at(2000), Some(23.0));
        for &f in FREQUENCIES.iter().filter(|&&f| f != 2000) {
            assert_eq!(adjusted.gain_at(f), Some(20.0), "frequency {} changed", f);
        }
        // Source snapshot untouched
        assert_eq!(curve.gain_at(2000), Some(20.0));
    }

    #[test]
    fn test_from_curve_clamps_measured_points() {
        let mut gains = [30.0; 11];
        gains[0] = -0.4;
        gains[10] = 95.0;
        let measured = MeasurementCurve::from_gains(MeasurementType::Rear, gains);
        let curve = AdjustableCurve::from_curve(&measured);

        assert_eq!(curve.gain_at(125), Some(MIN_GAIN_DB));
        assert_eq!(curve.gain_at(8000), Some(MAX_GAIN_DB));
        assert_eq!(curve.gain_at(1000), Some(30.0));

        // Adjusting another frequency keeps every point in range
        let adjusted = curve.adjusted(2000, 1.0).unwrap();
        assert!(adjusted
            .points()
            .iter()
            .all(|p| (MIN_GAIN_DB..=MAX_GAIN_DB).contains(&p.gain)));
    }

    #[test]
    fn test_adjust_clamps_both_ends() {
        let curve = AdjustableCurve::from_curve(&rear(78.0));
        assert_eq!(curve.adjusted(1000, 10.0).unwrap().gain_at(1000), Some(80.0));

        let curve = AdjustableCurve::from_curve(&rear(2.0));
        assert_eq!(curve.adjusted(1000, -10.0).unwrap().gain_at(1000), Some(0.0));
    }

    #[test]
    fn test_repeated_adjustments_stay_in_range() {
        let mut curve = AdjustableCurve::from_curve(&rear(40.0));
        let deltas = [15.0, 30.0, -100.0, 7.5, 90.0, -3.0, 12.0, -60.0];
        for (i, delta) in deltas.iter().cycle().take(200).enumerate() {
            let frequency = FREQUENCIES[i % FREQUENCIES.len()];
            curve = curve.adjusted(frequency, *delta).unwrap();
            assert!(curve
                .points()
                .iter()
                .all(|p| (MIN_GAIN_DB..=MAX_GAIN_DB).contains(&p.gain)));
        }
    }

    #[test]
    fn test_repeated_increments_accumulate() {
        let mut curve = AdjustableCurve::from_curve(&rear(30.0));
        for _ in 0..10 {
            curve = curve.adjusted(4000, 1.0).unwrap();
        }
        assert_eq!(curve.gain_at(4000), Some(40.0));
    }

    #[test]
    fn test_adjust_rejects_off_table_frequency() {
        let curve = AdjustableCurve::from_curve(&rear(30.0));
        assert!(curve.adjusted(2500, 1.0).is_none());
        assert!(curve.adjusted(2000, f32::NAN).is_none());
    }

    #[test]
    fn test_into_measurement_is_rear() {
        let curve = AdjustableCurve::from_curve(&rear(30.0))
            .adjusted(500, 5.0)
            .unwrap();
        let measured = curve.into_measurement();
        assert_eq!(measured.measurement_type, MeasurementType::Rear);
        assert_eq!(measured.gain_at(500), Some(35.0));
    }
}
