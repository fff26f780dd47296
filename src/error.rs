//! Error types for media generation.
//!
//! Errors are categorized by failure class so the generation task can map
//! them onto the status state machine: a missing source, a malformed volume,
//! and an encoder that produced nothing usable all end up as `error` status,
//! but they are logged with different context.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while producing a media artifact.
///
/// These never propagate to request handlers; the generation task catches
/// them at its boundary, records `error` status for the failing key, and
/// removes any partial output.
#[derive(Debug, Error)]
pub enum MediaError {
    /// No source file could be resolved for the item (unset root, missing
    /// directory, or no candidate matched).
    #[error("source not found for {0}")]
    SourceMissing(String),

    /// Source file exists but failed volume validation.
    #[error("invalid volume {path}: {reason}")]
    InvalidVolume { path: PathBuf, reason: String },

    /// Source file has an extension no renderer understands.
    #[error("unsupported source format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Rendering succeeded numerically but no encoder persisted the output.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Render exceeded the configured deadline.
    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure inside the imaging library.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl MediaError {
    /// Convenience constructor for validation failures.
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidVolume {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
