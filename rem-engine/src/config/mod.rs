//! TOML configuration loading for the simulator.
//!
//! Provides two loading methods:
//! - `default_config()` - Loads the configuration compiled into the binary
//! - `load_config(path)` - Loads a custom configuration from a file path

mod types;

pub use types::*;

use anyhow::Result;
use std::path::Path;

/// Default configuration embedded in the binary at compile time.
/// Loaded from `rem-engine/config/simulator.toml`.
const DEFAULT_CONFIG: &str = include_str!("../../config/simulator.toml");

/// Load and validate a configuration from a TOML file.
///
/// # Example
/// ```ignore
/// let config = load_config(Path::new("/path/to/simulator.toml"))?;
/// ```
pub fn load_config(path: &Path) -> Result<SimulatorConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate a configuration from TOML text.
pub fn parse_config(content: &str) -> Result<SimulatorConfig> {
    let config: SimulatorConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Get the default configuration embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_config() -> SimulatorConfig {
    parse_config(DEFAULT_CONFIG).expect("embedded simulator.toml must be a valid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_loads() {
        let config = default_config();
        assert_eq!(config.patients.len(), 4);
        assert_eq!(config.hearing_aids.len(), 3);
        assert!(config.patient("P001").is_some());
        assert!(config.hearing_aid("HA-RIC-60").is_some());
    }

    #[test]
    fn test_default_thresholds() {
        let config = default_config();
        assert_eq!(config.probe.min_depth_mm, 20.0);
        assert_eq!(config.probe.max_depth_mm, 30.0);
        assert_eq!(config.scoring.excellent, 90.0);
        assert_eq!(config.scoring.good, 80.0);
        assert_eq!(config.scoring.acceptable, 70.0);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[simulation]
seed = 7
noise_db = 0.0
latency_ms = 0
failure_rate = 0.0

[[patients]]
id = "X1"
name = "Flat"
left_thresholds = [40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0]
right_thresholds = [40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0, 40.0]

[[hearing_aids]]
id = "A1"
model = "Test aid"
max_gain_db = 60.0
max_output_db = 120.0
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.latency_ms, 0);
        // Sections left out fall back to defaults
        assert_eq!(config.probe, crate::measurement::ProbeThresholds::default());
        assert_eq!(config.scoring, ScoringConfig::default());
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config(Path::new("/nonexistent/simulator.toml")).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_probe_window() {
        let mut config = default_config();
        config.probe.min_depth_mm = 35.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_amounts() {
        let mut config = default_config();
        config.simulation.noise_db = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.scoring.penalty_per_db = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.scoring.penalty_per_db = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_config_rejects_infinite_noise() {
        let content = DEFAULT_CONFIG.replace("noise_db = 0.5", "noise_db = inf");
        assert_ne!(content, DEFAULT_CONFIG, "default config no longer sets noise_db = 0.5");
        assert!(parse_config(&content).is_err());
    }

    #[test]
    fn test_validate_rejects_unordered_tiers() {
        let mut config = default_config();
        config.scoring.good = 95.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_patient() {
        let mut config = default_config();
        let dup = config.patients[0].clone();
        config.patients.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate patient id"));
    }

    #[test]
    fn test_validate_rejects_bad_failure_rate() {
        let mut config = default_config();
        config.simulation.failure_rate = 1.5;
        assert!(config.validate().is_err());
    }
}
