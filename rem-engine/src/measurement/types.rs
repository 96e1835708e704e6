//! Core measurement vocabulary: measurement types, fitting parameters and
//! gain-vs-frequency curves.
//!
//! Every curve carries one point per entry of [`FREQUENCIES`], in table order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::levels::InputLevel;
use crate::error::RemError;

/// The fixed 11-point frequency table (Hz) shared by all curves.
pub const FREQUENCIES: [u32; 11] = [
    125, 250, 500, 750, 1000, 1500, 2000, 3000, 4000, 6000, 8000,
];

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// Real-ear measurement types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasurementType {
    /// Real-ear unaided response
    Reur,
    /// Real-ear occluded response
    Reor,
    /// Real-ear aided response
    Rear,
    /// Real-ear insertion gain
    Reig,
    /// Real-ear-to-coupler difference
    Recd,
    /// Real-ear saturation response
    Resr,
}

impl MeasurementType {
    pub const ALL: [MeasurementType; 6] = [
        MeasurementType::Reur,
        MeasurementType::Reor,
        MeasurementType::Rear,
        MeasurementType::Reig,
        MeasurementType::Recd,
        MeasurementType::Resr,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MeasurementType::Reur => "REUR",
            MeasurementType::Reor => "REOR",
            MeasurementType::Rear => "REAR",
            MeasurementType::Reig => "REIG",
            MeasurementType::Recd => "RECD",
            MeasurementType::Resr => "RESR",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MeasurementType::Reur => "Real-ear unaided response",
            MeasurementType::Reor => "Real-ear occluded response",
            MeasurementType::Rear => "Real-ear aided response",
            MeasurementType::Reig => "Real-ear insertion gain",
            MeasurementType::Recd => "Real-ear-to-coupler difference",
            MeasurementType::Resr => "Real-ear saturation response",
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MeasurementType {
    type Err = RemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeasurementType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RemError::Validation(format!("Unknown measurement type: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ear {
    Left,
    #[default]
    Right,
}

impl fmt::Display for Ear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ear::Left => f.write_str("left"),
            Ear::Right => f.write_str("right"),
        }
    }
}

impl FromStr for Ear {
    type Err = RemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" | "l" => Ok(Ear::Left),
            "right" | "r" => Ok(Ear::Right),
            _ => Err(RemError::Validation(format!("Unknown ear: {}", s))),
        }
    }
}

/// Stimulus used while measuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// International Speech Test Signal
    #[default]
    Ists,
    PinkNoise,
    WhiteNoise,
    PureToneSweep,
}

impl SignalType {
    /// Relative measurement variability of the stimulus (1.0 = ISTS).
    pub fn noise_factor(&self) -> f32 {
        match self {
            SignalType::Ists => 1.0,
            SignalType::PinkNoise => 0.8,
            SignalType::WhiteNoise => 1.2,
            SignalType::PureToneSweep => 0.4,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalType::Ists => "ISTS",
            SignalType::PinkNoise => "pink noise",
            SignalType::WhiteNoise => "white noise",
            SignalType::PureToneSweep => "pure-tone sweep",
        };
        f.write_str(s)
    }
}

impl FromStr for SignalType {
    type Err = RemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ists" => Ok(SignalType::Ists),
            "pink" | "pink_noise" | "pink-noise" => Ok(SignalType::PinkNoise),
            "white" | "white_noise" | "white-noise" => Ok(SignalType::WhiteNoise),
            "sweep" | "pure_tone_sweep" | "pure-tone-sweep" => Ok(SignalType::PureToneSweep),
            _ => Err(RemError::Validation(format!("Unknown signal type: {}", s))),
        }
    }
}

/// Acoustic vent of the earmold or dome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VentType {
    Closed,
    /// 1 mm vent
    Small,
    /// 2 mm vent
    #[default]
    Medium,
    /// 3 mm vent
    Large,
    Open,
}

impl VentType {
    /// Share of the open-ear resonance that survives with the earmold in place.
    pub fn retention(&self) -> f32 {
        match self {
            VentType::Closed => 0.0,
            VentType::Small => 0.2,
            VentType::Medium => 0.4,
            VentType::Large => 0.6,
            VentType::Open => 0.9,
        }
    }
}

impl fmt::Display for VentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VentType::Closed => "closed",
            VentType::Small => "small",
            VentType::Medium => "medium",
            VentType::Large => "large",
            VentType::Open => "open",
        };
        f.write_str(s)
    }
}

impl FromStr for VentType {
    type Err = RemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "closed" => Ok(VentType::Closed),
            "small" | "1mm" => Ok(VentType::Small),
            "medium" | "2mm" => Ok(VentType::Medium),
            "large" | "3mm" => Ok(VentType::Large),
            "open" => Ok(VentType::Open),
            _ => Err(RemError::Validation(format!("Unknown vent type: {}", s))),
        }
    }
}

/// Prescriptive fitting formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrescriptionMethod {
    #[default]
    NalNl2,
    DslV5,
    NalNl1,
    Custom,
}

impl PrescriptionMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PrescriptionMethod::NalNl2 => "NAL-NL2",
            PrescriptionMethod::DslV5 => "DSL v5",
            PrescriptionMethod::NalNl1 => "NAL-NL1",
            PrescriptionMethod::Custom => "Custom",
        }
    }
}

impl fmt::Display for PrescriptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PrescriptionMethod {
    type Err = RemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "nal-nl2" | "nalnl2" => Ok(PrescriptionMethod::NalNl2),
            "dsl" | "dsl-v5" | "dslv5" => Ok(PrescriptionMethod::DslV5),
            "nal-nl1" | "nalnl1" => Ok(PrescriptionMethod::NalNl1),
            "custom" => Ok(PrescriptionMethod::Custom),
            _ => Err(RemError::Validation(format!("Unknown prescription method: {}", s))),
        }
    }
}

// =============================================================================
// CURVES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Frequency in Hz (always a member of `FREQUENCIES`)
    pub frequency: u32,
    /// Gain in dB
    pub gain: f32,
}

/// Build table-ordered points from one gain per frequency.
pub fn points_from_gains(gains: [f32; 11]) -> Vec<CurvePoint> {
    FREQUENCIES
        .iter()
        .zip(gains)
        .map(|(&frequency, gain)| CurvePoint { frequency, gain })
        .collect()
}

/// Look up the gain at an exact table frequency.
pub fn gain_at(points: &[CurvePoint], frequency: u32) -> Option<f32> {
    points
        .iter()
        .find(|p| p.frequency == frequency)
        .map(|p| p.gain)
}

/// A measured gain-vs-frequency response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementCurve {
    pub measurement_type: MeasurementType,
    pub points: Vec<CurvePoint>,
    pub created_at: DateTime<Utc>,
}

impl MeasurementCurve {
    pub fn from_gains(measurement_type: MeasurementType, gains: [f32; 11]) -> Self {
        Self {
            measurement_type,
            points: points_from_gains(gains),
            created_at: Utc::now(),
        }
    }

    pub fn gain_at(&self, frequency: u32) -> Option<f32> {
        gain_at(&self.points, frequency)
    }
}

/// A prescriptive target. Never modified after generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCurve {
    pub target_type: MeasurementType,
    pub points: Vec<CurvePoint>,
    pub method: PrescriptionMethod,
    pub patient_id: String,
}

impl TargetCurve {
    pub fn gain_at(&self, frequency: u32) -> Option<f32> {
        gain_at(&self.points, frequency)
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Snapshot of the fitting a measurement is taken on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittingContext {
    pub patient_id: String,
    pub hearing_aid_id: String,
    pub vent_type: VentType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRequest {
    pub measurement_type: MeasurementType,
    pub ear: Ear,
    pub signal_type: SignalType,
    pub level: InputLevel,
    pub fitting: FittingContext,
}
