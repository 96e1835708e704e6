//! Simulator configuration types, loaded from TOML.

use serde::{Deserialize, Serialize};

use crate::error::RemError;
use crate::measurement::{Ear, ProbeThresholds};

/// Root configuration loaded from simulator.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Acceptable probe insertion window
    #[serde(default)]
    pub probe: ProbeThresholds,
    /// Feedback tiers and accuracy penalty
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Randomness, latency and failure injection for simulated measurements
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Simulated patients available for selection
    pub patients: Vec<PatientProfile>,
    /// Simulated hearing aids available for selection
    pub hearing_aids: Vec<HearingAidModel>,
}

/// Lower bounds (inclusive) for each feedback tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub excellent: f32,
    pub good: f32,
    pub acceptable: f32,
    /// Accuracy points lost per dB of mean absolute deviation from target
    pub penalty_per_db: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            excellent: 90.0,
            good: 80.0,
            acceptable: 70.0,
            penalty_per_db: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Peak uniform noise added to every simulated point, in dB
    pub noise_db: f32,
    /// Simulated instrument response time
    pub latency_ms: u64,
    /// Probability (0.0-1.0) that a measurement fails
    pub failure_rate: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            noise_db: 0.5,
            latency_ms: 300,
            failure_rate: 0.0,
        }
    }
}

/// A simulated patient with per-ear audiograms (dB HL over `FREQUENCIES`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: String,
    pub name: String,
    pub left_thresholds: [f32; 11],
    pub right_thresholds: [f32; 11],
}

impl PatientProfile {
    pub fn thresholds(&self, ear: Ear) -> &[f32; 11] {
        match ear {
            Ear::Left => &self.left_thresholds,
            Ear::Right => &self.right_thresholds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HearingAidModel {
    pub id: String,
    pub model: String,
    pub max_gain_db: f32,
    /// Saturation output (dB SPL)
    pub max_output_db: f32,
}

impl SimulatorConfig {
    pub fn patient(&self, id: &str) -> Option<&PatientProfile> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn hearing_aid(&self, id: &str) -> Option<&HearingAidModel> {
        self.hearing_aids.iter().find(|h| h.id == id)
    }

    /// Reject configurations the simulator cannot run with.
    pub fn validate(&self) -> Result<(), RemError> {
        let probe = &self.probe;
        if !(0.0 <= probe.min_depth_mm
            && probe.min_depth_mm <= probe.max_depth_mm
            && probe.max_depth_mm <= probe.instrument_max_mm)
        {
            return Err(RemError::Config(format!(
                "Probe window must satisfy 0 <= min ({}) <= max ({}) <= instrument max ({})",
                probe.min_depth_mm, probe.max_depth_mm, probe.instrument_max_mm
            )));
        }

        let scoring = &self.scoring;
        if !(scoring.excellent >= scoring.good && scoring.good >= scoring.acceptable) {
            return Err(RemError::Config(format!(
                "Feedback tiers must descend: excellent {} >= good {} >= acceptable {}",
                scoring.excellent, scoring.good, scoring.acceptable
            )));
        }
        if !(scoring.penalty_per_db.is_finite() && scoring.penalty_per_db >= 0.0) {
            return Err(RemError::Config(format!(
                "penalty_per_db must be a finite, non-negative number (got {})",
                scoring.penalty_per_db
            )));
        }

        let sim = &self.simulation;
        if !(sim.noise_db.is_finite() && sim.noise_db >= 0.0) {
            return Err(RemError::Config(format!(
                "noise_db must be a finite, non-negative number (got {})",
                sim.noise_db
            )));
        }
        if !(0.0..=1.0).contains(&sim.failure_rate) {
            return Err(RemError::Config(format!(
                "failure_rate {} must be between 0 and 1",
                sim.failure_rate
            )));
        }

        if self.patients.is_empty() || self.hearing_aids.is_empty() {
            return Err(RemError::Config(
                "At least one patient and one hearing aid must be configured".to_string(),
            ));
        }
        check_unique_ids(self.patients.iter().map(|p| p.id.as_str()), "patient")?;
        check_unique_ids(self.hearing_aids.iter().map(|h| h.id.as_str()), "hearing aid")?;

        for aid in &self.hearing_aids {
            if aid.max_gain_db <= 0.0 {
                return Err(RemError::Config(format!(
                    "Hearing aid {} must have positive max gain",
                    aid.id
                )));
            }
        }

        Ok(())
    }
}

fn check_unique_ids<'a>(ids: impl Iterator<Item = &'a str>, kind: &str) -> Result<(), RemError> {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(RemError::Config(format!("Empty {} id", kind)));
        }
        if !seen.insert(id) {
            return Err(RemError::Config(format!("Duplicate {} id: {}", kind, id)));
        }
    }
    Ok(())
}
