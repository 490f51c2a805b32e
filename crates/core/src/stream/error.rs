//! Error types for progressive streaming.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    /// The temporary output vanished (or the job failed) before completion.
    #[error("stream aborted: {path}")]
    Aborted { path: PathBuf },

    /// `complete` was called before the final file existed.
    #[error("final file missing: {path}")]
    FinalMissing { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    pub fn aborted(path: impl Into<PathBuf>) -> Self {
        Self::Aborted { path: path.into() }
    }

    /// Aborts surface to consumers as I/O errors.
    pub fn into_io(self) -> std::io::Error {
        match self {
            Self::Io(e) => e,
            other => std::io::Error::other(other.to_string()),
        }
    }
}
