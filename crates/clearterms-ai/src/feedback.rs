//! Bounded-step adaptation of the detector from analysis outcomes.

use std::collections::BTreeSet;

use clearterms_core::config::AdaptationConfig;
use clearterms_core::{DetectorModel, Signal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What happened after a page was offered for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// A meaningful analysis was produced.
    Success,
    /// Extraction yielded too little text to analyze.
    NoText,
}

/// Apply one outcome to `model`.
///
/// - `Success`: fired weights move up one step; if the page had not been
///   classified as a policy page, the threshold moves down one step.
/// - `NoText` on a page classified as a policy page: fired weights move
///   down one step and the threshold moves up one step.
///
/// The sample counter always increments. All moves are clamped by
/// [`DetectorModel`].
pub fn update_model(
    model: &mut DetectorModel,
    signals: &BTreeSet<Signal>,
    is_policy_page: bool,
    outcome: FeedbackOutcome,
    steps: &AdaptationConfig,
) {
    match outcome {
        FeedbackOutcome::Success => {
            for signal in signals {
                model.nudge_weight(*signal, steps.weight_step);
            }
            if !is_policy_page {
                model.nudge_threshold(-steps.threshold_step);
            }
        }
        FeedbackOutcome::NoText if is_policy_page => {
            for signal in signals {
                model.nudge_weight(*signal, -steps.weight_step);
            }
            model.nudge_threshold(steps.threshold_step);
        }
        FeedbackOutcome::NoText => {}
    }
    model.record_sample();
    debug!(
        ?outcome,
        is_policy_page,
        fired = signals.len(),
        threshold = model.threshold(),
        samples = model.samples(),
        "detector updated"
    );
}
