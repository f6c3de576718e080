use clearterms_core::ErrorKind;
use thiserror::Error;

/// Every way an analysis attempt can fail.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no API key configured")]
    NoApiKey,

    #[error("policy text is too short or missing ({chars} chars)")]
    NoText { chars: usize },

    #[error("model endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned no output")]
    EmptyResponse,

    #[error("no JSON object found in model output")]
    NoJsonFound,

    #[error("unable to parse model output: {0}")]
    Parse(String),

    #[error("analysis carried no usable content")]
    EmptyAnalysis,
}

impl AnalysisError {
    /// Wire-level kind reported to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoApiKey => ErrorKind::NoApiKey,
            Self::NoText { .. } => ErrorKind::NoText,
            Self::Upstream { .. } | Self::Http(_) => ErrorKind::UpstreamError,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::NoJsonFound => ErrorKind::NoJsonFound,
            Self::Parse(_) => ErrorKind::ParseError,
            Self::EmptyAnalysis => ErrorKind::EmptyAnalysis,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
