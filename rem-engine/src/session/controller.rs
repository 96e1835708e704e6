//! Single owner of REM session state.
//!
//! Every change goes through [`SessionController::dispatch`]. A dispatch never
//! panics or returns `Err`: refused preconditions come back as [`Blocked`],
//! collaborator failures as [`RemError`], and both are copied into the
//! operator-facing message slot. The measurement request is handed back as an
//! [`Effect`] for the runtime to perform; its result re-enters as
//! [`Command::MeasurementFinished`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::adjust::AdjustableCurve;
use super::scoring::FeedbackTier;
use super::stage::{self, Stage, StageTransition};
use super::types::Session;
use crate::config::ScoringConfig;
use crate::error::RemError;
use crate::measurement::{
    snap_level, Ear, FittingContext, InputLevel, MeasurementCurve, MeasurementRequest,
    MeasurementType, PrescriptionMethod, ProbePosition, SignalType, TargetCurve, VentType,
};
use crate::service::RemService;

// =============================================================================
// COMMANDS AND OUTCOMES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SelectPatient(String),
    SelectHearingAid(String),
    SelectEar(Ear),
    SelectVent(VentType),
    SelectSignal(SignalType),
    /// Raw slider value, snapped to the nearest valid level
    SetLevel(f32),
    SelectMethod(PrescriptionMethod),
    SetProbeDepth(f32),
    Next,
    Back,
    PerformMeasurement(MeasurementType),
    MeasurementFinished {
        ticket: MeasurementTicket,
        result: Result<MeasurementCurve, RemError>,
    },
    GenerateTargets,
    AdjustGain {
        frequency: u32,
        delta: f32,
    },
    ResetAdjustments,
    CheckTargetMatch,
    CompleteSession,
    PlaySignal,
    StopSignal,
    DismissMessage,
}

/// Identifies one in-flight measurement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MeasurementTicket {
    pub session_id: u64,
    pub sequence: u64,
}

/// Work the runtime must perform on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Measure {
        ticket: MeasurementTicket,
        request: MeasurementRequest,
    },
}

/// A refused precondition. The stage and data are left unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Blocked {
    MissingSelection,
    ProbeNotPositioned(ProbePosition),
    MeasurementPending,
    MeasurementMissing(MeasurementType),
    NoSession,
    AtFirstStage,
    AtLastStage,
    SessionCompleted,
    TargetNotChecked,
}

impl fmt::Display for Blocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocked::MissingSelection => {
                f.write_str("Select a patient and a hearing aid before continuing")
            }
            Blocked::ProbeNotPositioned(position) => write!(
                f,
                "Probe tube position is {}; place it correctly before measuring",
                position
            ),
            Blocked::MeasurementPending => f.write_str("A measurement is already in progress"),
            Blocked::MeasurementMissing(t) => {
                write!(f, "Complete the {} measurement before continuing", t)
            }
            Blocked::NoSession => f.write_str("No active session; confirm the setup first"),
            Blocked::AtFirstStage => f.write_str("Already at the first step"),
            Blocked::AtLastStage => f.write_str("Already at the last step"),
            Blocked::SessionCompleted => f.write_str("The session is completed and read-only"),
            Blocked::TargetNotChecked => {
                f.write_str("Check the adjusted response against the target first")
            }
        }
    }
}

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Stage after the command was applied
    pub stage: Stage,
    pub blocked: Option<Blocked>,
    pub error: Option<RemError>,
    pub effect: Option<Effect>,
}

impl Dispatch {
    pub fn is_ok(&self) -> bool {
        self.blocked.is_none() && self.error.is_none()
    }
}

enum Rejection {
    Blocked(Blocked),
    Failed(RemError),
}

impl From<Blocked> for Rejection {
    fn from(blocked: Blocked) -> Self {
        Rejection::Blocked(blocked)
    }
}

impl From<RemError> for Rejection {
    fn from(err: RemError) -> Self {
        Rejection::Failed(err)
    }
}

type Applied = Result<Option<Effect>, Rejection>;

// =============================================================================
// STATE
// =============================================================================

/// Operator choices made on the setup and measurement screens.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SetupSelection {
    pub patient_id: Option<String>,
    pub hearing_aid_id: Option<String>,
    pub ear: Ear,
    pub vent_type: VentType,
    pub signal_type: SignalType,
    pub level: InputLevel,
    pub method: PrescriptionMethod,
}

/// Stage-specific slice of the controller state.
#[derive(Debug, Clone, PartialEq)]
pub enum StageView<'a> {
    Setup {
        selection: &'a SetupSelection,
    },
    ProbePosition {
        depth_mm: Option<f32>,
        position: ProbePosition,
    },
    Measurement {
        measurement_type: MeasurementType,
        curve: Option<&'a MeasurementCurve>,
        signal_type: SignalType,
        level: InputLevel,
        signal_playing: bool,
    },
    TargetCompare {
        curves: &'a [MeasurementCurve],
        target: Option<&'a TargetCurve>,
        method: PrescriptionMethod,
    },
    Adjust {
        curve: Option<&'a AdjustableCurve>,
        target: Option<&'a TargetCurve>,
        accuracy: Option<f32>,
        feedback: Option<FeedbackTier>,
        completed: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct View<'a> {
    pub stage: Stage,
    pub message: Option<&'a str>,
    pub is_loading: bool,
    pub detail: StageView<'a>,
}

pub struct SessionController<S> {
    service: Arc<S>,
    scoring: ScoringConfig,
    stage: Stage,
    selection: SetupSelection,
    probe_depth: Option<f32>,
    probe_position: ProbePosition,
    session: Option<Session>,
    active_measurement: MeasurementType,
    current_target: Option<TargetCurve>,
    adjustable: Option<AdjustableCurve>,
    accuracy: Option<f32>,
    feedback: Option<FeedbackTier>,
    in_flight: Option<MeasurementTicket>,
    next_sequence: u64,
    signal_playing: bool,
    message: Option<String>,
}

impl<S: RemService> SessionController<S> {
    pub fn new(service: Arc<S>, scoring: ScoringConfig) -> Self {
        Self {
            service,
            scoring,
            stage: Stage::Setup,
            selection: SetupSelection::default(),
            probe_depth: None,
            probe_position: ProbePosition::NotInserted,
            session: None,
            active_measurement: MeasurementType::Reur,
            current_target: None,
            adjustable: None,
            accuracy: None,
            feedback: None,
            in_flight: None,
            next_sequence: 0,
            signal_playing: false,
            message: None,
        }
    }

    pub fn service(&self) -> Arc<S> {
        Arc::clone(&self.service)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn selection(&self) -> &SetupSelection {
        &self.selection
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn probe_position(&self) -> ProbePosition {
        self.probe_position
    }

    pub fn active_measurement(&self) -> MeasurementType {
        self.active_measurement
    }

    pub fn current_target(&self) -> Option<&TargetCurve> {
        self.current_target.as_ref()
    }

    pub fn adjustable(&self) -> Option<&AdjustableCurve> {
        self.adjustable.as_ref()
    }

    pub fn accuracy(&self) -> Option<f32> {
        self.accuracy
    }

    pub fn feedback(&self) -> Option<FeedbackTier> {
        self.feedback
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_signal_playing(&self) -> bool {
        self.signal_playing
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Target used for scoring: the session's REIG target, else the displayed one.
    pub fn scoring_target(&self) -> Option<&TargetCurve> {
        self.session
            .as_ref()
            .and_then(|s| s.target(MeasurementType::Reig))
            .or(self.current_target.as_ref())
    }

    pub fn view(&self) -> View<'_> {
        let detail = match self.stage {
            Stage::Setup => StageView::Setup {
                selection: &self.selection,
            },
            Stage::ProbePosition => StageView::ProbePosition {
                depth_mm: self.probe_depth,
                position: self.probe_position,
            },
            Stage::Reur | Stage::Reor | Stage::Rear | Stage::Reig => {
                let measurement_type = self.stage.measurement_type().unwrap_or(self.active_measurement);
                StageView::Measurement {
                    measurement_type,
                    curve: self.session.as_ref().and_then(|s| s.curve(measurement_type)),
                    signal_type: self.selection.signal_type,
                    level: self.selection.level,
                    signal_playing: self.signal_playing,
                }
            }
            Stage::TargetCompare => StageView::TargetCompare {
                curves: self
                    .session
                    .as_ref()
                    .map(|s| s.curves.as_slice())
                    .unwrap_or_default(),
                target: self.current_target.as_ref(),
                method: self.selection.method,
            },
            Stage::Adjust => StageView::Adjust {
                curve: self.adjustable.as_ref(),
                target: self.scoring_target(),
                accuracy: self.accuracy,
                feedback: self.feedback,
                completed: self.session.as_ref().is_some_and(|s| s.completed),
            },
        };

        View {
            stage: self.stage,
            message: self.message(),
            is_loading: self.is_loading(),
            detail,
        }
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    pub fn dispatch(&mut self, command: Command) -> Dispatch {
        let applied = match command {
            Command::MeasurementFinished { ticket, result } => {
                self.finish_measurement(ticket, result)
            }
            Command::DismissMessage => {
                self.message = None;
                Ok(None)
            }
            other => {
                self.message = None;
                self.apply(other)
            }
        };

        match applied {
            Ok(effect) => Dispatch {
                stage: self.stage,
                blocked: None,
                error: None,
                effect,
            },
            Err(Rejection::Blocked(blocked)) => {
                debug!("Blocked at {:?}: {}", self.stage, blocked);
                self.message = Some(blocked.to_string());
                Dispatch {
                    stage: self.stage,
                    blocked: Some(blocked),
                    error: None,
                    effect: None,
                }
            }
            Err(Rejection::Failed(err)) => {
                warn!("Operation failed at {:?}: {}", self.stage, err);
                self.message = Some(err.to_string());
                Dispatch {
                    stage: self.stage,
                    blocked: None,
                    error: Some(err),
                    effect: None,
                }
            }
        }
    }

    fn apply(&mut self, command: Command) -> Applied {
        match command {
            Command::SelectPatient(id) => {
                self.selection.patient_id = non_empty(id);
                Ok(None)
            }
            Command::SelectHearingAid(id) => {
                self.selection.hearing_aid_id = non_empty(id);
                Ok(None)
            }
            Command::SelectEar(ear) => {
                self.selection.ear = ear;
                Ok(None)
            }
            Command::SelectVent(vent) => {
                self.selection.vent_type = vent;
                Ok(None)
            }
            Command::SelectSignal(signal) => {
                self.selection.signal_type = signal;
                Ok(None)
            }
            Command::SetLevel(raw) => {
                self.selection.level = snap_level(raw);
                Ok(None)
            }
            Command::SelectMethod(method) => {
                self.selection.method = method;
                Ok(None)
            }
            Command::SetProbeDepth(depth_mm) => {
                let position = self.service.position_probe_tube(depth_mm)?;
                self.probe_depth = Some(depth_mm);
                self.probe_position = position;
                Ok(None)
            }
            Command::Next => self.next(),
            Command::Back => self.back(),
            Command::PerformMeasurement(measurement_type) => self.request_measurement(measurement_type),
            Command::GenerateTargets => self.generate_targets(),
            Command::AdjustGain { frequency, delta } => self.adjust_gain(frequency, delta),
            Command::ResetAdjustments => self.reset_adjustments(),
            Command::CheckTargetMatch => self.check_target_match(),
            Command::CompleteSession => self.complete_session(),
            Command::PlaySignal => {
                let s = &self.selection;
                self.service.play_test_signal(s.signal_type, s.level, s.ear);
                self.signal_playing = true;
                Ok(None)
            }
            Command::StopSignal => {
                self.service.stop_test_signal();
                self.signal_playing = false;
                Ok(None)
            }
            Command::MeasurementFinished { .. } | Command::DismissMessage => Ok(None),
        }
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    fn take(&mut self, transition: StageTransition) {
        info!("Stage {:?} -> {:?}", self.stage, transition.next);
        self.stage = transition.next;
        if let Some(measurement_type) = transition.active_measurement {
            self.active_measurement = measurement_type;
        }
    }

    fn next(&mut self) -> Applied {
        if self.in_flight.is_some() {
            return Err(Blocked::MeasurementPending.into());
        }

        match self.stage {
            Stage::Setup => {
                let (Some(patient_id), Some(hearing_aid_id)) =
                    (&self.selection.patient_id, &self.selection.hearing_aid_id)
                else {
                    return Err(Blocked::MissingSelection.into());
                };
                let mut session =
                    self.service
                        .create_session(patient_id, hearing_aid_id, self.selection.ear)?;
                session.vent_type = self.selection.vent_type;
                self.start_session(session);
                self.take(stage::confirm_setup());
            }
            Stage::ProbePosition => {
                if self.probe_position != ProbePosition::Correct {
                    return Err(Blocked::ProbeNotPositioned(self.probe_position).into());
                }
                self.take(stage::probe_verified());
            }
            Stage::Reur | Stage::Reor | Stage::Rear => {
                let required = self.stage.measurement_type().unwrap_or(self.active_measurement);
                if self.session.as_ref().and_then(|s| s.curve(required)).is_none() {
                    return Err(Blocked::MeasurementMissing(required).into());
                }
                if let Some(transition) = stage::measurement_completed(self.stage) {
                    self.take(transition);
                }
            }
            Stage::Reig => self.take(stage::open_target_compare()),
            Stage::TargetCompare => {
                self.take(stage::open_adjustment());
                if self.adjustable.is_none() {
                    self.adjustable = self.rear_copy();
                }
            }
            Stage::Adjust => return Err(Blocked::AtLastStage.into()),
        }
        Ok(None)
    }

    fn back(&mut self) -> Applied {
        let previous = self.stage.previous().ok_or(Blocked::AtFirstStage)?;
        info!("Stage {:?} -> {:?} (back)", self.stage, previous);
        self.stage = previous;
        Ok(None)
    }

    /// Install a fresh session and clear everything collected for the last one.
    fn start_session(&mut self, session: Session) {
        self.session = Some(session);
        self.probe_depth = None;
        self.probe_position = ProbePosition::NotInserted;
        self.active_measurement = MeasurementType::Reur;
        self.current_target = None;
        self.adjustable = None;
        self.accuracy = None;
        self.feedback = None;
    }

    // =========================================================================
    // MEASUREMENT
    // =========================================================================

    /// Mutable access to a session that still accepts changes.
    fn open_session(&mut self) -> Result<&mut Session, Blocked> {
        match self.session.as_mut() {
            None => Err(Blocked::NoSession),
            Some(s) if s.completed => Err(Blocked::SessionCompleted),
            Some(s) => Ok(s),
        }
    }

    fn request_measurement(&mut self, measurement_type: MeasurementType) -> Applied {
        if self.in_flight.is_some() {
            return Err(Blocked::MeasurementPending.into());
        }
        let sequence = self.next_sequence;
        let SetupSelection {
            ear,
            vent_type,
            signal_type,
            level,
            ..
        } = self.selection;
        let session = self.open_session()?;

        if measurement_type == MeasurementType::Reor {
            session.vent_type = vent_type;
        }

        let ticket = MeasurementTicket {
            session_id: session.id,
            sequence,
        };
        let request = MeasurementRequest {
            measurement_type,
            ear,
            signal_type,
            level,
            fitting: FittingContext {
                patient_id: session.patient_id.clone(),
                hearing_aid_id: session.hearing_aid_id.clone(),
                vent_type: session.vent_type,
            },
        };

        self.next_sequence += 1;
        self.in_flight = Some(ticket);
        info!("Requested {} measurement ({:?})", measurement_type, ticket);
        Ok(Some(Effect::Measure { ticket, request }))
    }

    fn finish_measurement(
        &mut self,
        ticket: MeasurementTicket,
        result: Result<MeasurementCurve, RemError>,
    ) -> Applied {
        if self.in_flight != Some(ticket) {
            warn!("Discarding result for stale measurement {:?}", ticket);
            return Ok(None);
        }
        self.in_flight = None;

        // Setup and completion are refused while a ticket is outstanding, so the
        // ticket always belongs to the open session.
        let curve = result?;
        let session = self.open_session()?;
        let measurement_type = curve.measurement_type;
        session.replace_curve(curve);
        self.message = None;
        info!("Stored {} curve for session {}", measurement_type, ticket.session_id);

        if self.stage.measurement_type() == Some(measurement_type) {
            if let Some(transition) = stage::measurement_completed(self.stage) {
                self.take(transition);
            }
        }
        Ok(None)
    }

    // =========================================================================
    // TARGETS, ADJUSTMENT AND SCORING
    // =========================================================================

    fn generate_targets(&mut self) -> Applied {
        let method = self.selection.method;
        let active = self.active_measurement;
        let service = Arc::clone(&self.service);
        let session = self.open_session()?;

        let targets = service.generate_targets(&session.patient_id, session.ear, method)?;
        let current = targets
            .iter()
            .find(|t| t.target_type == active)
            .or_else(|| targets.first())
            .cloned();
        session.targets = targets;
        self.current_target = current;
        Ok(None)
    }

    fn rear_copy(&self) -> Option<AdjustableCurve> {
        self.session
            .as_ref()
            .and_then(|s| s.curve(MeasurementType::Rear))
            .map(AdjustableCurve::from_curve)
    }

    fn adjust_gain(&mut self, frequency: u32, delta: f32) -> Applied {
        self.open_session()?;

        let Some(base) = self.adjustable.take().or_else(|| self.rear_copy()) else {
            debug!("No REAR curve to adjust");
            return Ok(None);
        };

        let next = base.adjusted(frequency, delta);
        if next.is_none() {
            warn!("Ignoring adjustment of {} dB at {} Hz", delta, frequency);
        }
        self.adjustable = Some(next.unwrap_or(base));
        Ok(None)
    }

    fn reset_adjustments(&mut self) -> Applied {
        self.open_session()?;
        self.adjustable = self.rear_copy();
        self.accuracy = None;
        self.feedback = None;
        Ok(None)
    }

    fn check_target_match(&mut self) -> Applied {
        self.open_session()?;

        let (Some(curve), Some(target)) = (self.adjustable.as_ref(), self.scoring_target()) else {
            debug!("Nothing to score: missing adjusted curve or target");
            return Ok(None);
        };

        let accuracy = self.service.calculate_accuracy(curve.points(), target);
        let feedback = FeedbackTier::classify(accuracy, &self.scoring);
        info!("Target match {:.1}% ({})", accuracy, feedback);
        self.accuracy = Some(accuracy);
        self.feedback = Some(feedback);
        Ok(None)
    }

    fn complete_session(&mut self) -> Applied {
        if self.in_flight.is_some() {
            return Err(Blocked::MeasurementPending.into());
        }
        let (Some(accuracy), Some(adjusted)) = (self.accuracy, self.adjustable.clone()) else {
            self.open_session()?;
            return Err(Blocked::TargetNotChecked.into());
        };

        let session = self.open_session()?;
        session.replace_curve(adjusted.into_measurement());
        session.completed = true;
        session.accuracy = Some(accuracy);
        info!("Session {} completed with {:.1}% accuracy", session.id, accuracy);
        Ok(None)
    }
}

fn non_empty(id: String) -> Option<String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
