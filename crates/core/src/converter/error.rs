//! Error types for the media engine.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConverterError {
    /// An engine executable (ffmpeg or ffprobe) could not be started.
    #[error("{tool} not found at {path}")]
    ToolNotFound { tool: &'static str, path: PathBuf },

    #[error("input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("cannot create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The encoder exited unsuccessfully. `stderr` holds the tail of its log.
    #[error("conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("subtitle extraction failed: {reason}")]
    SubtitleExtractionFailed { reason: String },

    #[error("engine gave up after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("probe failed: {reason}")]
    ProbeFailed { reason: String },

    /// ffprobe answered with something that is not its JSON document.
    #[error("unreadable probe output: {reason}")]
    ParseError { reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("conversion cancelled")]
    Cancelled,
}

impl ConverterError {
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn subtitle_failed(reason: impl Into<String>) -> Self {
        Self::SubtitleExtractionFailed {
            reason: reason.into(),
        }
    }

    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Maps a failure to launch `tool`; a missing executable becomes
    /// [`ToolNotFound`](Self::ToolNotFound).
    pub(crate) fn launch(tool: &'static str, path: &std::path::Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::ToolNotFound {
                tool,
                path: path.to_path_buf(),
            }
        } else {
            Self::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_maps_missing_binary() {
        let err = ConverterError::launch(
            "ffprobe",
            std::path::Path::new("/opt/ffprobe"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert_eq!(err.to_string(), "ffprobe not found at /opt/ffprobe");

        let err = ConverterError::launch(
            "ffmpeg",
            std::path::Path::new("ffmpeg"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, ConverterError::Io(_)));
    }
}
