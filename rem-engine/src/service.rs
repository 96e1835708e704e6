//! Collaborator contract the session core depends on.
//!
//! The controller calls the synchronous operations inline. The measurement
//! request is the single asynchronous boundary and is run by
//! `MeasurementDriver`.

use std::future::Future;

use crate::error::RemError;
use crate::measurement::{
    CurvePoint, Ear, InputLevel, MeasurementCurve, MeasurementRequest, PrescriptionMethod,
    ProbePosition, SignalType, TargetCurve,
};
use crate::session::Session;

pub trait RemService: Send + Sync + 'static {
    /// Open a session. Unknown patient or hearing-aid ids are a validation error.
    fn create_session(
        &self,
        patient_id: &str,
        hearing_aid_id: &str,
        ear: Ear,
    ) -> Result<Session, RemError>;

    /// Classify a probe depth. Out-of-range depths are a validation error.
    fn position_probe_tube(&self, depth_mm: f32) -> Result<ProbePosition, RemError>;

    fn perform_measurement(
        &self,
        request: MeasurementRequest,
    ) -> impl Future<Output = Result<MeasurementCurve, RemError>> + Send;

    /// Prescribe targets for one ear of a patient.
    fn generate_targets(
        &self,
        patient_id: &str,
        ear: Ear,
        method: PrescriptionMethod,
    ) -> Result<Vec<TargetCurve>, RemError>;

    /// Deterministic accuracy (0-100) of `points` against `target`.
    fn calculate_accuracy(&self, points: &[CurvePoint], target: &TargetCurve) -> f32;

    fn play_test_signal(&self, signal: SignalType, level: InputLevel, ear: Ear);

    fn stop_test_signal(&self);
}
