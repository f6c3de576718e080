//! Shared configuration.
//!
//! Every struct defaults to the tuned values the pipeline ships with; a JSON
//! settings file only needs to name the fields it overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading settings file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("parsing settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Thresholds used by the page classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Distinct legal-term hits needed for the `legal_terms` signal.
    pub legal_terms_min_hits: usize,
    /// Legal-term hits that, together with longform text, force a positive verdict.
    pub legal_terms_override_hits: usize,
    /// Body length (chars) at which `longform_text` fires.
    pub longform_min_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            legal_terms_min_hits: 4,
            legal_terms_override_hits: 6,
            longform_min_chars: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Below this many chars the next extraction fallback stage is tried.
    pub min_candidate_chars: usize,
    pub max_text_chars: usize,
    pub truncation_marker: String,
    /// Delays before each re-capture when the extracted text stays short.
    pub retry_delays_ms: Vec<u64>,
}

impl ExtractionConfig {
    pub fn retry_delays(&self) -> impl Iterator<Item = Duration> + '_ {
        self.retry_delays_ms.iter().map(|ms| Duration::from_millis(*ms))
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_candidate_chars: 800,
            max_text_chars: 24_000,
            truncation_marker: " [TRUNCATED]".to_string(),
            retry_delays_ms: vec![600, 1200],
        }
    }
}

/// Limits applied when shaping model output into an [`crate::Analysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardenerConfig {
    /// A gist shorter than this counts as "no gist" for the meaningfulness gate.
    pub min_gist_chars: usize,
    pub max_gist_chars: usize,
    pub max_red_flags: usize,
    pub max_evidence_quotes: usize,
    pub max_disclaimers: usize,
    pub default_confidence: f64,
}

impl Default for HardenerConfig {
    fn default() -> Self {
        Self {
            min_gist_chars: 20,
            max_gist_chars: 400,
            max_red_flags: 8,
            max_evidence_quotes: 2,
            max_disclaimers: 3,
            default_confidence: 0.3,
        }
    }
}

/// Step sizes for the online weight update. Bounds are fixed in
/// [`crate::detector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    pub weight_step: f64,
    pub threshold_step: f64,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            weight_step: 0.1,
            threshold_step: 0.1,
        }
    }
}

/// Model endpoint and request controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Tried in order; the first model that yields a meaningful report wins.
    pub models: Vec<String>,
    pub endpoint_base: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub repair_temperature: f32,
    pub max_output_tokens: u32,
    pub max_input_chars: usize,
    /// Texts shorter than this are rejected with `NO_TEXT`.
    pub min_text_chars: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            models: vec!["gemini-2.5-flash".to_string(), "gemini-2.0-flash".to_string()],
            endpoint_base: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            temperature: 0.2,
            repair_temperature: 0.0,
            max_output_tokens: 700,
            max_input_chars: 12_000,
            min_text_chars: 400,
        }
    }
}

/// All tunables, grouped by component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub classifier: ClassifierConfig,
    pub extraction: ExtractionConfig,
    pub hardener: HardenerConfig,
    pub adaptation: AdaptationConfig,
    pub analyzer: AnalyzerConfig,
}

impl Settings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_defaults() {
        let json = r#"{ "hardener": { "min_gist_chars": 40 }, "analyzer": { "models": ["m1"] } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.hardener.min_gist_chars, 40);
        assert_eq!(settings.hardener.max_gist_chars, 400);
        assert_eq!(settings.analyzer.models, vec!["m1"]);
        assert_eq!(settings.analyzer.min_text_chars, 400);
        assert_eq!(settings.classifier, ClassifierConfig::default());
    }

    #[test]
    fn retry_delays_in_order() {
        let cfg = ExtractionConfig::default();
        let delays: Vec<_> = cfg.retry_delays().collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(600), Duration::from_millis(1200)]
        );
    }

    #[test]
    fn missing_settings_file_is_io_error() {
        let err = Settings::load(Path::new("/nonexistent/clearterms.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
