//! Simulated REM instrument.
//!
//! `SimulatedRemService` implements [`RemService`] on top of the acoustic
//! model in [`model`], the configured patient and hearing-aid catalogs, and a
//! seeded random source for measurement noise and failure injection.

pub mod model;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::SimulatorConfig;
use crate::error::RemError;
use crate::measurement::{
    points_from_gains, CurvePoint, Ear, InputLevel, MeasurementCurve, MeasurementRequest,
    MeasurementType, PrescriptionMethod, ProbePosition, SignalType, TargetCurve,
};
use crate::service::RemService;
use crate::session::{accuracy_against_target, Session};

/// The signal currently played into the sound field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveSignal {
    pub signal: SignalType,
    pub level: InputLevel,
    pub ear: Ear,
}

pub struct SimulatedRemService {
    config: SimulatorConfig,
    rng: Mutex<StdRng>,
    next_session_id: AtomicU64,
    active_signal: Mutex<Option<ActiveSignal>>,
}

impl SimulatedRemService {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.simulation.seed);
        Self {
            config,
            rng: Mutex::new(rng),
            next_session_id: AtomicU64::new(1),
            active_signal: Mutex::new(None),
        }
    }

    pub fn active_signal(&self) -> Option<ActiveSignal> {
        *self
            .active_signal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Compute the noisy curve for a request, or fail the measurement.
    fn simulate(&self, request: &MeasurementRequest) -> Result<MeasurementCurve, RemError> {
        let fitting = &request.fitting;
        let patient = self.config.patient(&fitting.patient_id).ok_or_else(|| {
            RemError::MeasurementFailure(format!("Unknown patient: {}", fitting.patient_id))
        })?;
        let aid = self
            .config
            .hearing_aid(&fitting.hearing_aid_id)
            .ok_or_else(|| {
                RemError::MeasurementFailure(format!(
                    "Unknown hearing aid: {}",
                    fitting.hearing_aid_id
                ))
            })?;

        let ideal = model::ideal_response(
            request.measurement_type,
            aid,
            patient.thresholds(request.ear),
            fitting.vent_type,
            request.level.db() as f32,
        );

        let sim = &self.config.simulation;
        let amplitude = sim.noise_db * request.signal_type.noise_factor();
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        if sim.failure_rate > 0.0 && rng.random::<f32>() < sim.failure_rate {
            return Err(RemError::MeasurementFailure(
                "Probe tube blocked; re-seat the probe and measure again".to_string(),
            ));
        }

        let mut gains = ideal;
        for gain in gains.iter_mut() {
            let noise = if amplitude > 0.0 {
                rng.random_range(-amplitude..=amplitude)
            } else {
                0.0
            };
            *gain = round_tenth(*gain + noise);
        }

        Ok(MeasurementCurve::from_gains(request.measurement_type, gains))
    }
}

fn round_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

impl RemService for SimulatedRemService {
    fn create_session(
        &self,
        patient_id: &str,
        hearing_aid_id: &str,
        ear: Ear,
    ) -> Result<Session, RemError> {
        if self.config.patient(patient_id).is_none() {
            return Err(RemError::Validation(format!("Unknown patient: {}", patient_id)));
        }
        if self.config.hearing_aid(hearing_aid_id).is_none() {
            return Err(RemError::Validation(format!(
                "Unknown hearing aid: {}",
                hearing_aid_id
            )));
        }

        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        info!(
            "Created session {} for patient {} with {} ({} ear)",
            id, patient_id, hearing_aid_id, ear
        );
        Ok(Session::new(id, patient_id, hearing_aid_id, ear))
    }

    fn position_probe_tube(&self, depth_mm: f32) -> Result<ProbePosition, RemError> {
        let position = self.config.probe.classify(depth_mm)?;
        debug!("Probe depth {} mm classified as {}", depth_mm, position);
        Ok(position)
    }

    async fn perform_measurement(
        &self,
        request: MeasurementRequest,
    ) -> Result<MeasurementCurve, RemError> {
        let latency = self.config.simulation.latency_ms;
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let result = self.simulate(&request);
        match &result {
            Ok(_) => info!(
                "Measured {} on {} ear at {} with {}",
                request.measurement_type, request.ear, request.level, request.signal_type
            ),
            Err(e) => warn!("{} measurement failed: {}", request.measurement_type, e),
        }
        result
    }

    fn generate_targets(
        &self,
        patient_id: &str,
        ear: Ear,
        method: PrescriptionMethod,
    ) -> Result<Vec<TargetCurve>, RemError> {
        let patient = self.config.patient(patient_id).ok_or_else(|| {
            RemError::GenerationFailure(format!("No audiogram for patient {}", patient_id))
        })?;

        let insertion = model::prescribe_insertion_gain(method, patient.thresholds(ear));
        let mut aided = insertion;
        for (gain, resonance) in aided.iter_mut().zip(model::OPEN_EAR_RESONANCE) {
            *gain += resonance;
        }

        let target = |target_type: MeasurementType, gains: [f32; 11]| TargetCurve {
            target_type,
            points: points_from_gains(gains.map(round_tenth)),
            method,
            patient_id: patient_id.to_string(),
        };

        info!("Generated {} targets for patient {} ({} ear)", method, patient_id, ear);
        Ok(vec![
            target(MeasurementType::Rear, aided),
            target(MeasurementType::Reig, insertion),
        ])
    }

    fn calculate_accuracy(&self, points: &[CurvePoint], target: &TargetCurve) -> f32 {
        accuracy_against_target(points, target, self.config.scoring.penalty_per_db)
    }

    fn play_test_signal(&self, signal: SignalType, level: InputLevel, ear: Ear) {
        let mut active = self
            .active_signal
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *active = Some(ActiveSignal { signal, level, ear });
        info!("Playing {} at {} ({} ear)", signal, level, ear);
    }

    fn stop_test_signal(&self) {
        let mut active = self
            .active_signal
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if active.take().is_some() {
            info!("Stopped test signal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::measurement::{FittingContext, VentType, FREQUENCIES};

    fn quiet_service() -> SimulatedRemService {
        let mut config = default_config();
        config.simulation.latency_ms = 0;
        config.simulation.noise_db = 0.0;
        SimulatedRemService::new(config)
    }

    fn request(measurement_type: MeasurementType) -> MeasurementRequest {
        MeasurementRequest {
            measurement_type,
            ear: Ear::Right,
            signal_type: SignalType::Ists,
            level: InputLevel::default(),
            fitting: FittingContext {
                patient_id: "P002".to_string(),
                hearing_aid_id: "HA-RIC-60".to_string(),
                vent_type: VentType::Medium,
            },
        }
    }

    #[test]
    fn test_create_session_validates_ids() {
        let service = quiet_service();
        let session = service.create_session("P001", "HA-RIC-60", Ear::Left).unwrap();
        assert_eq!(session.patient_id, "P001");
        assert!(!session.completed);

        assert!(matches!(
            service.create_session("nobody", "HA-RIC-60", Ear::Left),
            Err(RemError::Validation(_))
        ));
        assert!(matches!(
            service.create_session("P001", "HA-NONE", Ear::Left),
            Err(RemError::Validation(_))
        ));
    }

    #[test]
    fn test_session_ids_increase() {
        let service = quiet_service();
        let a = service.create_session("P001", "HA-RIC-60", Ear::Left).unwrap();
        let b = service.create_session("P001", "HA-RIC-60", Ear::Left).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_probe_positions() {
        let service = quiet_service();
        assert_eq!(service.position_probe_tube(24.0).unwrap(), ProbePosition::Correct);
        assert_eq!(service.position_probe_tube(10.0).unwrap(), ProbePosition::TooShallow);
        assert_eq!(service.position_probe_tube(35.0).unwrap(), ProbePosition::TooDeep);
        assert!(service.position_probe_tube(80.0).is_err());
    }

    #[tokio::test]
    async fn test_measurement_covers_frequency_table() {
        let service = quiet_service();
        let curve = service
            .perform_measurement(request(MeasurementType::Reur))
            .await
            .unwrap();
        assert_eq!(curve.measurement_type, MeasurementType::Reur);
        let freqs: Vec<u32> = curve.points.iter().map(|p| p.frequency).collect();
        assert_eq!(freqs, FREQUENCIES.to_vec());
        assert_eq!(curve.gain_at(3000), Some(17.0));
    }

    #[tokio::test]
    async fn test_measurement_noise_is_bounded() {
        let mut config = default_config();
        config.simulation.latency_ms = 0;
        config.simulation.noise_db = 1.0;
        let service = SimulatedRemService::new(config);

        for _ in 0..20 {
            let curve = service
                .perform_measurement(request(MeasurementType::Reur))
                .await
                .unwrap();
            for (point, ideal) in curve.points.iter().zip(model::OPEN_EAR_RESONANCE) {
                assert!((point.gain - ideal).abs() <= 1.1);
            }
        }
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mut config = default_config();
        config.simulation.latency_ms = 0;
        config.simulation.failure_rate = 1.0;
        let service = SimulatedRemService::new(config);

        let result = service.perform_measurement(request(MeasurementType::Rear)).await;
        assert!(matches!(result, Err(RemError::MeasurementFailure(_))));
    }

    #[tokio::test]
    async fn test_unknown_fitting_fails_measurement() {
        let service = quiet_service();
        let mut req = request(MeasurementType::Reur);
        req.fitting.patient_id = "ghost".to_string();
        let result = service.perform_measurement(req).await;
        assert!(matches!(result, Err(RemError::MeasurementFailure(_))));
    }

    #[test]
    fn test_generate_targets() {
        let service = quiet_service();
        let targets = service
            .generate_targets("P002", Ear::Right, PrescriptionMethod::NalNl2)
            .unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].target_type, MeasurementType::Rear);
        assert_eq!(targets[1].target_type, MeasurementType::Reig);
        assert!(targets.iter().all(|t| t.patient_id == "P002"));
        assert!(targets.iter().all(|t| t.points.len() == FREQUENCIES.len()));

        assert!(matches!(
            service.generate_targets("ghost", Ear::Right, PrescriptionMethod::NalNl2),
            Err(RemError::GenerationFailure(_))
        ));
    }

    #[test]
    fn test_calculate_accuracy_is_deterministic() {
        let service = quiet_service();
        let targets = service
            .generate_targets("P001", Ear::Left, PrescriptionMethod::DslV5)
            .unwrap();
        let points = points_from_gains([20.0; 11]);
        let a = service.calculate_accuracy(&points, &targets[1]);
        let b = service.calculate_accuracy(&points, &targets[1]);
        assert_eq!(a, b);
        assert!((0.0..=100.0).contains(&a));
    }

    #[test]
    fn test_signal_playback() {
        let service = quiet_service();
        assert!(service.active_signal().is_none());
        service.play_test_signal(SignalType::PinkNoise, InputLevel::default(), Ear::Left);
        assert_eq!(
            service.active_signal().map(|s| s.signal),
            Some(SignalType::PinkNoise)
        );
        service.stop_test_signal();
        assert!(service.active_signal().is_none());
        // Stopping again is a no-op
        service.stop_test_signal();
    }
}
