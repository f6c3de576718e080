use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetching {url} returned {status}")]
    Fetch { url: String, status: u16 },

    #[error("invalid configuration: {0}")]
    Setup(String),
}
