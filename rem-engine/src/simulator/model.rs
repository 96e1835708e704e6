//! Acoustic model behind the simulated measurements and prescriptions.
//!
//! All tables are indexed like `FREQUENCIES`. Values are typical adult
//! figures, good enough for training rather than clinical use.

use crate::config::HearingAidModel;
use crate::measurement::{MeasurementType, PrescriptionMethod, VentType};

/// Average open-ear canal resonance (REUR), dB.
pub const OPEN_EAR_RESONANCE: [f32; 11] = [
    0.0, 0.5, 1.5, 2.5, 3.5, 7.0, 12.0, 17.0, 14.0, 6.0, 3.0,
];

/// Attenuation of sound reaching the eardrum with a closed earmold, dB.
pub const INSERTION_LOSS: [f32; 11] = [0.0, 0.0, 0.0, 0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0];

/// Average adult real-ear-to-coupler difference, dB.
pub const ADULT_RECD: [f32; 11] = [2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, 11.0, 12.0, 13.0];

/// Low-frequency gain that escapes through a fully open vent, dB.
const VENT_LEAKAGE: [f32; 11] = [18.0, 14.0, 8.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

/// NAL-R style frequency corrections, dB.
const NAL_CORRECTION: [f32; 11] = [
    -20.0, -17.0, -8.0, -3.0, 1.0, 1.0, -1.0, -2.0, -2.0, -2.0, -2.0,
];

/// Level at which the first-fit gain is specified (dB SPL).
const REFERENCE_LEVEL: f32 = 65.0;
/// Gain change per dB of input away from the reference level (2:1 compression).
const COMPRESSION_SLOPE: f32 = 0.5;
/// Share of the NAL-NL2 target a first fit lands on.
const FIRST_FIT_SHARE: f32 = 0.8;

const MAX_PRESCRIBED_GAIN: f32 = 80.0;

/// Prescribed insertion gain for an audiogram.
pub fn prescribe_insertion_gain(method: PrescriptionMethod, thresholds: &[f32; 11]) -> [f32; 11] {
    // Indices of 500, 1000 and 2000 Hz
    let three_freq_avg = (thresholds[2] + thresholds[4] + thresholds[6]) / 3.0;

    let mut gains = [0.0; 11];
    for (i, gain) in gains.iter_mut().enumerate() {
        let hl = thresholds[i];
        let nal_r = 0.15 * three_freq_avg + 0.31 * hl + NAL_CORRECTION[i];
        let raw = match method {
            PrescriptionMethod::NalNl1 => nal_r,
            PrescriptionMethod::NalNl2 => 0.9 * nal_r + 1.0,
            PrescriptionMethod::DslV5 => 0.55 * hl + 0.25 * NAL_CORRECTION[i].min(0.0),
            // Half-gain rule
            PrescriptionMethod::Custom => 0.5 * hl,
        };
        *gain = raw.clamp(0.0, MAX_PRESCRIBED_GAIN);
    }
    gains
}

/// Occluded response for the given vent.
pub fn occluded_response(vent: VentType) -> [f32; 11] {
    let retention = vent.retention();
    let mut gains = [0.0; 11];
    for (i, gain) in gains.iter_mut().enumerate() {
        *gain = OPEN_EAR_RESONANCE[i] * retention - INSERTION_LOSS[i] * (1.0 - retention);
    }
    gains
}

/// Insertion gain the hearing aid delivers at an input level.
pub fn delivered_insertion_gain(
    aid: &HearingAidModel,
    thresholds: &[f32; 11],
    vent: VentType,
    level_db: f32,
) -> [f32; 11] {
    let prescribed = prescribe_insertion_gain(PrescriptionMethod::NalNl2, thresholds);
    let compression = (level_db - REFERENCE_LEVEL) * COMPRESSION_SLOPE;

    let mut gains = [0.0; 11];
    for (i, gain) in gains.iter_mut().enumerate() {
        let first_fit = (prescribed[i] * FIRST_FIT_SHARE).min(aid.max_gain_db);
        let leakage = VENT_LEAKAGE[i] * vent.retention();
        *gain = (first_fit - compression - leakage).max(0.0);
    }
    gains
}

/// Noise-free response for a measurement type.
pub fn ideal_response(
    measurement_type: MeasurementType,
    aid: &HearingAidModel,
    thresholds: &[f32; 11],
    vent: VentType,
    level_db: f32,
) -> [f32; 11] {
    let insertion = delivered_insertion_gain(aid, thresholds, vent, level_db);
    let mut gains = [0.0; 11];
    for (i, gain) in gains.iter_mut().enumerate() {
        *gain = match measurement_type {
            MeasurementType::Reur => OPEN_EAR_RESONANCE[i],
            MeasurementType::Reor => occluded_response(vent)[i],
            MeasurementType::Rear => OPEN_EAR_RESONANCE[i] + insertion[i],
            MeasurementType::Reig => insertion[i],
            MeasurementType::Recd => ADULT_RECD[i],
            MeasurementType::Resr => {
                let aided = OPEN_EAR_RESONANCE[i] + insertion[i];
                aided.min(aid.max_output_db - level_db)
            }
        };
    }
    gains
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aid(max_gain_db: f32) -> HearingAidModel {
        HearingAidModel {
            id: "A".to_string(),
            model: "test".to_string(),
            max_gain_db,
            max_output_db: 115.0,
        }
    }

    const FLAT_50: [f32; 11] = [50.0; 11];

    #[test]
    fn test_more_loss_more_gain() {
        for method in [
            PrescriptionMethod::NalNl2,
            PrescriptionMethod::DslV5,
            PrescriptionMethod::NalNl1,
            PrescriptionMethod::Custom,
        ] {
            let mild = prescribe_insertion_gain(method, &[20.0; 11]);
            let moderate = prescribe_insertion_gain(method, &FLAT_50);
            assert!(
                mild.iter().zip(moderate.iter()).all(|(m, s)| m <= s),
                "{} not monotonic",
                method
            );
        }
    }

    #[test]
    fn test_prescription_in_range() {
        let gains = prescribe_insertion_gain(PrescriptionMethod::DslV5, &[120.0; 11]);
        assert!(gains.iter().all(|g| (0.0..=MAX_PRESCRIBED_GAIN).contains(g)));
        let gains = prescribe_insertion_gain(PrescriptionMethod::Custom, &[0.0; 11]);
        assert!(gains.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_closed_vent_removes_resonance() {
        let closed = occluded_response(VentType::Closed);
        assert!(closed.iter().all(|&g| g <= 0.0));
        let open = occluded_response(VentType::Open);
        // 3 kHz keeps most of the 17 dB resonance
        assert!(open[7] > 14.0);
    }

    #[test]
    fn test_compression_reduces_gain_at_high_levels() {
        let soft = delivered_insertion_gain(&aid(70.0), &FLAT_50, VentType::Closed, 50.0);
        let loud = delivered_insertion_gain(&aid(70.0), &FLAT_50, VentType::Closed, 90.0);
        assert!(soft.iter().zip(loud.iter()).all(|(s, l)| s >= l));
        assert!(soft[6] > loud[6]);
    }

    #[test]
    fn test_gain_limited_by_aid() {
        let gains = delivered_insertion_gain(&aid(10.0), &[90.0; 11], VentType::Closed, 65.0);
        assert!(gains.iter().all(|&g| g <= 10.0));
    }

    #[test]
    fn test_insertion_gain_is_aided_minus_unaided() {
        let rear = ideal_response(MeasurementType::Rear, &aid(60.0), &FLAT_50, VentType::Medium, 65.0);
        let reig = ideal_response(MeasurementType::Reig, &aid(60.0), &FLAT_50, VentType::Medium, 65.0);
        for i in 0..11 {
            assert!((rear[i] - OPEN_EAR_RESONANCE[i] - reig[i]).abs() < 1e-4);
        }
    }
}
