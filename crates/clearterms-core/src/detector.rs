//! Page-detection signals and the adaptive weight table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Lower and upper bound for any signal weight.
pub const WEIGHT_BOUNDS: (f64, f64) = (0.5, 4.0);
/// Lower and upper bound for the decision threshold.
pub const THRESHOLD_BOUNDS: (f64, f64) = (3.0, 7.0);
pub const DEFAULT_THRESHOLD: f64 = 5.0;
/// Bumped when the persisted layout of [`DetectorModel`] changes.
pub const DETECTOR_VERSION: u32 = 1;

/// One detection cue evaluated against a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    UrlPattern,
    TitleKeyword,
    HeadingKeyword,
    BodyKeyword,
    LegalTerms,
    LongformText,
}

impl Signal {
    pub const ALL: [Signal; 6] = [
        Self::UrlPattern,
        Self::TitleKeyword,
        Self::HeadingKeyword,
        Self::BodyKeyword,
        Self::LegalTerms,
        Self::LongformText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UrlPattern => "url_pattern",
            Self::TitleKeyword => "title_keyword",
            Self::HeadingKeyword => "heading_keyword",
            Self::BodyKeyword => "body_keyword",
            Self::LegalTerms => "legal_terms",
            Self::LongformText => "longform_text",
        }
    }

    pub fn default_weight(&self) -> f64 {
        match self {
            Self::UrlPattern => 2.0,
            Self::TitleKeyword => 2.0,
            Self::HeadingKeyword => 2.0,
            Self::BodyKeyword => 1.0,
            Self::LegalTerms => 2.0,
            Self::LongformText => 1.0,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent, slowly-adapting classifier state.
///
/// Fields are private: weights and threshold only move through
/// [`nudge_weight`](Self::nudge_weight) and
/// [`nudge_threshold`](Self::nudge_threshold), which clamp into
/// [`WEIGHT_BOUNDS`] and [`THRESHOLD_BOUNDS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorModel {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    weights: BTreeMap<Signal, f64>,
    #[serde(default = "default_threshold")]
    threshold: f64,
    #[serde(default)]
    samples: u64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for DetectorModel {
    fn default() -> Self {
        Self {
            version: DETECTOR_VERSION,
            weights: Signal::ALL
                .into_iter()
                .map(|s| (s, s.default_weight()))
                .collect(),
            threshold: DEFAULT_THRESHOLD,
            samples: 0,
        }
    }
}

impl DetectorModel {
    /// Repair a model read back from storage: missing signals take their
    /// default weight, non-finite values reset to defaults, everything is
    /// clamped into bounds.
    pub fn sanitized(mut self) -> Self {
        for signal in Signal::ALL {
            let w = self
                .weights
                .get(&signal)
                .copied()
                .filter(|w| w.is_finite())
                .unwrap_or_else(|| signal.default_weight());
            self.weights.insert(signal, clamp(w, WEIGHT_BOUNDS));
        }
        if !self.threshold.is_finite() {
            self.threshold = DEFAULT_THRESHOLD;
        }
        self.threshold = clamp(self.threshold, THRESHOLD_BOUNDS);
        self.version = DETECTOR_VERSION;
        self
    }

    pub fn weight(&self, signal: Signal) -> f64 {
        self.weights
            .get(&signal)
            .copied()
            .unwrap_or_else(|| signal.default_weight())
    }

    pub fn weights(&self) -> &BTreeMap<Signal, f64> {
        &self.weights
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Sum of the weights of every fired signal.
    pub fn score(&self, signals: &BTreeSet<Signal>) -> f64 {
        signals.iter().map(|s| self.weight(*s)).sum()
    }

    /// Move one weight by `delta`, clamped into [`WEIGHT_BOUNDS`].
    pub fn nudge_weight(&mut self, signal: Signal, delta: f64) {
        let next = clamp(self.weight(signal) + delta, WEIGHT_BOUNDS);
        self.weights.insert(signal, next);
    }

    /// Move the threshold by `delta`, clamped into [`THRESHOLD_BOUNDS`].
    pub fn nudge_threshold(&mut self, delta: f64) {
        self.threshold = clamp(self.threshold + delta, THRESHOLD_BOUNDS);
    }

    pub fn record_sample(&mut self) {
        self.samples = self.samples.saturating_add(1);
    }
}

fn clamp(value: f64, (lo, hi): (f64, f64)) -> f64 {
    value.max(lo).min(hi)
}

/// Verdict for a single page evaluation. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub is_policy_page: bool,
    pub signals: BTreeSet<Signal>,
    pub score: f64,
}
