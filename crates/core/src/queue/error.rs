//! Error types for the conversion queue.

use thiserror::Error;

use crate::converter::ConverterError;
use crate::media::MediaId;
use crate::stream::StreamError;

/// Why a job stopped before draining all its steps.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job's cancellation token fired.
    #[error("job cancelled")]
    Cancelled,

    /// The media engine reported a failure.
    #[error("engine error: {0}")]
    Engine(#[from] ConverterError),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("job failed: {reason}")]
    Failed { reason: String },
}

impl JobError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Engine-side cancellation counts as cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Engine(ConverterError::Cancelled))
    }
}

/// Errors raised when submitting work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue has been shut down.
    #[error("conversion queue is shut down")]
    Disposed,

    /// A job for this entity is already outstanding.
    #[error("a conversion is already tracked for {id}")]
    AlreadyConverting { id: MediaId },
}
