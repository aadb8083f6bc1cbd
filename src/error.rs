//! Error types shared by every pipeline stage.
//!
//! Fatal conditions carry the offending path and the underlying cause so a
//! failed run can be diagnosed from the log alone. Row-level validation
//! failures are never represented here; they are routed to the rejected
//! dataset by the cleaner.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    /// The input of a stage could not be opened or parsed.
    #[error("source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An output of a stage could not be written.
    #[error("sink unwritable: {path}: {source}")]
    SinkUnwritable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EtlError {
    pub fn source_unavailable(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        EtlError::SourceUnavailable {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn sink_unwritable(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        EtlError::SinkUnwritable {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
