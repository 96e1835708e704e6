//! Plain-text rendering of controller views.

use std::fmt::Write;

use rem_engine::measurement::{CurvePoint, MeasurementCurve, TargetCurve};
use rem_engine::session::{Dispatch, FeedbackTier, Session, Stage, StageView, View};
use rem_engine::SimulatorConfig;
use serde::Serialize;

/// Machine-readable snapshot printed by the `json` command.
#[derive(Serialize)]
pub struct Snapshot<'a> {
    pub stage: Stage,
    pub is_loading: bool,
    pub message: Option<&'a str>,
    pub accuracy: Option<f32>,
    pub feedback: Option<FeedbackTier>,
    pub session: Option<&'a Session>,
}

pub fn view(view: &View<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}]", view.stage);

    match &view.detail {
        StageView::Setup { selection } => {
            let _ = writeln!(
                out,
                "  patient: {}  aid: {}  ear: {}  vent: {}",
                selection.patient_id.as_deref().unwrap_or("-"),
                selection.hearing_aid_id.as_deref().unwrap_or("-"),
                selection.ear,
                selection.vent_type
            );
            let _ = writeln!(
                out,
                "  signal: {}  level: {}  method: {}",
                selection.signal_type, selection.level, selection.method
            );
        }
        StageView::ProbePosition { depth_mm, position } => {
            let depth = depth_mm.map_or("-".to_string(), |d| format!("{:.1} mm", d));
            let _ = writeln!(out, "  depth: {}  position: {}", depth, position);
        }
        StageView::Measurement {
            measurement_type,
            curve,
            signal_type,
            level,
            signal_playing,
        } => {
            let _ = writeln!(
                out,
                "  {}: {}",
                measurement_type,
                measurement_type.description()
            );
            let playing = if *signal_playing { " (playing)" } else { "" };
            let _ = writeln!(out, "  signal: {} at {}{}", signal_type, level, playing);
            match curve {
                Some(curve) => out.push_str(&curve_table(&[curve_row(curve)])),
                None => out.push_str("  not measured yet\n"),
            }
        }
        StageView::TargetCompare {
            curves,
            target,
            method,
        } => {
            let mut rows: Vec<(String, &[CurvePoint])> = curves.iter().map(curve_row).collect();
            if let Some(target) = target {
                rows.push(target_row(target));
            } else {
                let _ = writeln!(out, "  no {} target yet; run 'targets'", method);
            }
            out.push_str(&curve_table(&rows));
        }
        StageView::Adjust {
            curve,
            target,
            accuracy,
            feedback,
            completed,
        } => {
            let mut rows = Vec::new();
            if let Some(curve) = curve {
                rows.push(("adjusted".to_string(), curve.points()));
            }
            if let Some(target) = target {
                rows.push(target_row(target));
            }
            if rows.is_empty() {
                out.push_str("  nothing to adjust; measure REAR first\n");
            } else {
                out.push_str(&curve_table(&rows));
            }
            if let (Some(accuracy), Some(feedback)) = (accuracy, feedback) {
                let _ = writeln!(out, "  accuracy: {:.1}%  {}", accuracy, feedback.message());
            }
            if *completed {
                out.push_str("  session completed\n");
            }
        }
    }

    if view.is_loading {
        out.push_str("  measuring...\n");
    }
    if let Some(message) = view.message {
        let _ = writeln!(out, "  ! {}", message);
    }
    out
}

/// Text for a dispatch outcome, if anything went wrong.
pub fn outcome(dispatch: &Dispatch) -> Option<String> {
    if let Some(blocked) = &dispatch.blocked {
        return Some(format!("blocked: {}", blocked));
    }
    dispatch.error.as_ref().map(|e| format!("error: {}", e))
}

pub fn patients(config: &SimulatorConfig) -> String {
    let mut out = String::new();
    for patient in &config.patients {
        let _ = writeln!(out, "{:<8} {}", patient.id, patient.name);
    }
    out
}

pub fn hearing_aids(config: &SimulatorConfig) -> String {
    let mut out = String::new();
    for aid in &config.hearing_aids {
        let _ = writeln!(
            out,
            "{:<12} {:<28} gain {:>3.0} dB  output {:>3.0} dB SPL",
            aid.id, aid.model, aid.max_gain_db, aid.max_output_db
        );
    }
    out
}

fn curve_row(curve: &MeasurementCurve) -> (String, &[CurvePoint]) {
    (curve.measurement_type.to_string(), curve.points.as_slice())
}

fn target_row(target: &TargetCurve) -> (String, &[CurvePoint]) {
    (
        format!("{} target", target.target_type),
        target.points.as_slice(),
    )
}

/// One column per frequency, one row per curve.
fn curve_table(rows: &[(String, &[CurvePoint])]) -> String {
    let mut out = String::new();
    let Some((_, first)) = rows.first() else {
        return out;
    };

    let _ = write!(out, "  {:<12}", "Hz");
    for point in first.iter() {
        let _ = write!(out, "{:>7}", point.frequency);
    }
    out.push('\n');

    for (label, points) in rows {
        let _ = write!(out, "  {:<12}", label);
        for point in points.iter() {
            let _ = write!(out, "{:>7.1}", point.gain);
        }
        out.push('\n');
    }
    out
}
