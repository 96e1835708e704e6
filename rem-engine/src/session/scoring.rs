//! Target-match accuracy and feedback tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::measurement::{CurvePoint, TargetCurve};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTier {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl FeedbackTier {
    /// Tiers are checked from the top down; the first threshold met wins.
    pub fn classify(accuracy: f32, scoring: &ScoringConfig) -> Self {
        if accuracy >= scoring.excellent {
            FeedbackTier::Excellent
        } else if accuracy >= scoring.good {
            FeedbackTier::Good
        } else if accuracy >= scoring.acceptable {
            FeedbackTier::Acceptable
        } else {
            FeedbackTier::Poor
        }
    }

    /// Operator-facing feedback text.
    pub fn message(&self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Excellent match to target. The fitting is verified.",
            FeedbackTier::Good => "Good match. Small deviations remain at some frequencies.",
            FeedbackTier::Acceptable => {
                "Acceptable match. Fine-tune the frequencies furthest from target."
            }
            FeedbackTier::Poor => "Poor match. Adjust gain towards the target and check again.",
        }
    }
}

impl fmt::Display for FeedbackTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeedbackTier::Excellent => "excellent",
            FeedbackTier::Good => "good",
            FeedbackTier::Acceptable => "acceptable",
            FeedbackTier::Poor => "poor",
        };
        f.write_str(s)
    }
}

/// Accuracy (0-100) of a curve against a target.
///
/// Uses the mean absolute deviation over frequencies present in both curves,
/// scaled by `penalty_per_db`. Curves without a common frequency score 0.
pub fn accuracy_against_target(points: &[CurvePoint], target: &TargetCurve, penalty_per_db: f32) -> f32 {
    let deviations: Vec<f32> = points
        .iter()
        .filter_map(|p| target.gain_at(p.frequency).map(|t| (p.gain - t).abs()))
        .collect();

    if deviations.is_empty() {
        return 0.0;
    }

    let mean = deviations.iter().sum::<f32>() / deviations.len() as f32;
    (100.0 - penalty_per_db * mean).clamp(0.0, 100.0)
}
