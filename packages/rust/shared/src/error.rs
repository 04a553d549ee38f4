//! Error types for DocPilot.
//!
//! Library crates use [`DocPilotError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Merge conflicts are deliberately *not* represented here: a preserved
//! manual block is a recorded advisory, not a failure.

use std::path::PathBuf;

/// Top-level error type for all DocPilot operations.
#[derive(Debug, thiserror::Error)]
pub enum DocPilotError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Per-file extraction error (non-fatal at the pipeline level; the
    /// offending file is skipped and recorded).
    #[error("extraction error in {path:?}: {message}")]
    Extraction { path: PathBuf, message: String },

    /// Generation capability error (transport, timeout, or a response
    /// that failed schema validation). Retryable by the suggestion engine.
    #[error("generation error: {0}")]
    Generation(String),

    /// Database or execution-log error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Persisted document could not be parsed back into blocks.
    #[error("document format error: {0}")]
    DocumentFormat(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocPilotError>;

impl DocPilotError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a per-file extraction error.
    pub fn extraction(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
