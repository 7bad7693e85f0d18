//! Error types for report ingestion and deduplication.
//!
//! Two layers: [`ReportError`] describes why a single report file could not
//! take part in deduplication, [`DedupError`] is what aborts a whole run.
//! A `ReportError` only becomes a `DedupError` when the caller asks for
//! fail-fast behavior or when discovery itself fails.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a single report was excluded from deduplication.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read report: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed report: {0}")]
    Malformed(String),

    #[error("missing required metadata key `{0}`")]
    MissingMeta(String),

    #[error("invalid value for metadata key `{key}`: {value:?}")]
    InvalidMeta { key: String, value: String },

    #[error("parse worker failed: {0}")]
    Worker(String),

    #[error("parse timed out after {0:?}")]
    TimedOut(Duration),
}

impl ReportError {
    /// Machine-readable code for logging and JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Malformed(_) => "malformed",
            Self::MissingMeta(_) => "missing_meta",
            Self::InvalidMeta { .. } => "invalid_meta",
            Self::Worker(_) => "worker",
            Self::TimedOut(_) => "timed_out",
        }
    }

    /// Create a malformed-report error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Run-level failure.
#[derive(Debug, Error)]
pub enum DedupError {
    #[error("failed to list reports in {}: {source}", dir.display())]
    Discovery {
        dir: PathBuf,
        #[source]
        source: ReportError,
    },

    #[error("report {} failed: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: ReportError,
    },

    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DedupError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for run-level operations
pub type Result<T> = std::result::Result<T, DedupError>;
