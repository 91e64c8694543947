//! Error types shared across the analysis pipeline.

use thiserror::Error;

/// Main error type for statement analysis operations.
#[derive(Error, Debug)]
pub enum AmlError {
    /// No transaction table header row was found in the document.
    #[error("No table header detected in scanned band y={y_start:.1}..{y_end:.1}")]
    NoHeaderDetected { y_start: f64, y_end: f64 },

    /// The PDF has no extractable text layer.
    #[error("Document has no text layer")]
    EmptyTextLayer,

    /// The document format is not supported by any parser.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An external collaborator (OCR, ML detector) failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// A pipeline stage exceeded its deadline.
    #[error("Stage '{stage}' timed out after {elapsed_ms} ms")]
    StageTimeout { stage: String, elapsed_ms: u64 },

    /// The run was cancelled at a stage boundary.
    #[error("Cancelled before stage '{stage}'")]
    Cancelled { stage: String },
}

impl AmlError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create an unsupported format error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a collaborator error.
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Create a stage timeout error.
    pub fn stage_timeout(stage: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::StageTimeout {
            stage: stage.into(),
            elapsed_ms,
        }
    }
}

/// Result alias used throughout the workspace.
pub type AmlResult<T> = Result<T, AmlError>;
