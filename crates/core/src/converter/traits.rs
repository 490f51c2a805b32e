//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::ConverterError;
use super::types::{
    ConversionProgress, ConversionResult, MediaInfo, SubtitleExtraction, TranscodeRequest,
};

/// The external media engine: probes files and runs conversion steps.
///
/// Progress senders may be dropped by the receiver at any time; conversion
/// continues without reporting. Implementations must stop promptly and
/// return [`ConverterError::Cancelled`] once `cancel` fires.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Probes a media file to get its information.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError>;

    /// Writes a streamable rendition of the input to `request.output_path`.
    async fn transcode(
        &self,
        request: TranscodeRequest,
        progress_tx: mpsc::Sender<ConversionProgress>,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError>;

    /// Extracts text subtitle tracks to WebVTT files.
    async fn extract_subtitles(
        &self,
        request: SubtitleExtraction,
        progress_tx: mpsc::Sender<ConversionProgress>,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;

    /// File extensions worth probing.
    fn supported_input_formats(&self) -> &[&str] {
        &[
            "mkv", "mp4", "m4v", "avi", "mov", "wmv", "webm", "ts", "m2ts", "mpg", "mpeg", "flv",
        ]
    }
}
