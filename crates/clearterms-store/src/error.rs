use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store file is corrupt: {0}")]
    Corrupt(String),
}
