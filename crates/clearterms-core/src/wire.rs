//! Request/response types exchanged with the UI layer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;
use crate::detector::Signal;

/// Wire-level failure kind returned to callers instead of a partial report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NoApiKey,
    NoText,
    UpstreamError,
    EmptyResponse,
    NoJsonFound,
    ParseError,
    EmptyAnalysis,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoApiKey => "NO_API_KEY",
            Self::NoText => "NO_TEXT",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::EmptyResponse => "EMPTY_RESPONSE",
            Self::NoJsonFound => "NO_JSON_FOUND",
            Self::ParseError => "PARSE_ERROR",
            Self::EmptyAnalysis => "EMPTY_ANALYSIS",
        }
    }

    /// Whether the model-fallback loop moves on to the next model.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NoApiKey | Self::NoText)
    }

    /// Short message suitable for a status line.
    pub fn status_message(&self) -> &'static str {
        match self {
            Self::NoApiKey => "Add your Gemini API key in settings.",
            Self::NoText => "Policy text is too short or missing.",
            Self::UpstreamError => "Gemini request failed. Check your key and quota.",
            Self::EmptyResponse => "Gemini returned no output.",
            Self::NoJsonFound | Self::ParseError => "Unable to parse model output.",
            Self::EmptyAnalysis => "Analysis was inconclusive. Try again.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of `classify_and_extract`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedPage {
    pub url: String,
    pub title: String,
    pub is_policy_page: bool,
    pub signals: BTreeSet<Signal>,
    pub score: f64,
    pub text: String,
    pub text_hash: String,
    pub domain: String,
}

impl CollectedPage {
    /// The analysis request a UI would send for this page.
    pub fn to_request(&self) -> AnalyzeRequest {
        AnalyzeRequest {
            url: self.url.clone(),
            title: self.title.clone(),
            text: self.text.clone(),
            text_hash: Some(self.text_hash.clone()),
            is_policy_page: self.is_policy_page,
            signals: self.signals.clone(),
        }
    }
}

/// Input of `analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub text: String,
    /// Recomputed from `text` when absent.
    #[serde(default)]
    pub text_hash: Option<String>,
    #[serde(default)]
    pub is_policy_page: bool,
    #[serde(default)]
    pub signals: BTreeSet<Signal>,
}

/// Either a complete report or a typed error, never a partial object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Report {
        analysis: Analysis,
    },
    Error {
        error: ErrorKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl AnalyzeResponse {
    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            Self::Report { analysis } => Some(analysis),
            Self::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Report { .. } => None,
            Self::Error { error, .. } => Some(*error),
        }
    }
}

/// Output of `get_cached`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub analysis: Option<Analysis>,
}
