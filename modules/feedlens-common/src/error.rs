use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedlensError>;

#[derive(Error, Debug)]
pub enum FeedlensError {
    #[error("Ingestion error in {file}: {reason}")]
    Ingest { file: PathBuf, reason: String },

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Scrape failed during {stage}: {message}")]
    Scrape { stage: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
