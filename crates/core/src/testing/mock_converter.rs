//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use super::fixtures;
use crate::converter::{
    ConversionProgress, ConversionResult, ConversionTarget, Converter, ConverterError, MediaInfo,
    SubtitleExtraction, TranscodeRequest,
};

/// A recorded transcode for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTranscode {
    /// The request that was submitted.
    pub request: TranscodeRequest,
    /// Whether the transcode succeeded.
    pub success: bool,
}

/// A recorded subtitle extraction for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedExtraction {
    pub request: SubtitleExtraction,
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Control probe results per path
/// - Simulate success/failure of transcodes and subtitle extraction
/// - Write the output progressively, in chunks, like a real encoder
/// - Honour cancellation between chunks
///
/// # Example
///
/// ```rust,ignore
/// use mediashelf_core::testing::{fixtures, MockConverter};
///
/// let converter = MockConverter::new();
/// converter.set_probe_result("/movies/movie.mkv", fixtures::hevc_4k_info("/movies/movie.mkv")).await;
/// converter.set_conversion_duration(Duration::from_millis(200)).await;
///
/// // ... run a conversion through the library service ...
///
/// let transcodes = converter.recorded_transcodes().await;
/// assert_eq!(transcodes.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockConverter {
    /// Recorded transcodes.
    transcodes: Arc<RwLock<Vec<RecordedTranscode>>>,
    /// Recorded subtitle extractions.
    extractions: Arc<RwLock<Vec<RecordedExtraction>>>,
    /// Pre-configured probe results by path.
    probe_results: Arc<RwLock<HashMap<PathBuf, MediaInfo>>>,
    /// One-shot probe failures by path.
    probe_errors: Arc<RwLock<HashMap<PathBuf, ConverterError>>>,
    /// If set, the next transcode fails with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// If set, the next subtitle extraction fails with this error.
    next_subtitle_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated conversion duration in milliseconds.
    conversion_duration_ms: Arc<RwLock<u64>>,
    /// Number of chunks a transcode writes.
    chunks: Arc<RwLock<usize>>,
    /// Bytes per chunk.
    chunk_size: Arc<RwLock<usize>>,
    /// Whether to send progress updates during conversion.
    send_progress: Arc<RwLock<bool>>,
    /// Default media info for probing unknown files.
    default_media_info: Arc<RwLock<Option<MediaInfo>>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            transcodes: Arc::new(RwLock::new(Vec::new())),
            extractions: Arc::new(RwLock::new(Vec::new())),
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            probe_errors: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            next_subtitle_error: Arc::new(RwLock::new(None)),
            conversion_duration_ms: Arc::new(RwLock::new(50)),
            chunks: Arc::new(RwLock::new(5)),
            chunk_size: Arc::new(RwLock::new(4096)),
            send_progress: Arc::new(RwLock::new(true)),
            default_media_info: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded transcodes.
    pub async fn recorded_transcodes(&self) -> Vec<RecordedTranscode> {
        self.transcodes.read().await.clone()
    }

    /// Get all recorded subtitle extractions.
    pub async fn recorded_extractions(&self) -> Vec<RecordedExtraction> {
        self.extractions.read().await.clone()
    }

    /// Clear recorded operations.
    pub async fn clear_recorded(&self) {
        self.transcodes.write().await.clear();
        self.extractions.write().await.clear();
    }

    /// Get the number of transcodes performed.
    pub async fn transcode_count(&self) -> usize {
        self.transcodes.read().await.len()
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, info: MediaInfo) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), info);
    }

    /// Make the next probe of `path` fail.
    pub async fn set_probe_error(&self, path: impl AsRef<Path>, error: ConverterError) {
        self.probe_errors
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), error);
    }

    /// Set the default media info for probing unknown files.
    pub async fn set_default_media_info(&self, info: MediaInfo) {
        *self.default_media_info.write().await = Some(info);
    }

    /// Configure the next transcode to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Configure the next subtitle extraction to fail with the given error.
    pub async fn set_next_subtitle_error(&self, error: ConverterError) {
        *self.next_subtitle_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
        *self.next_subtitle_error.write().await = None;
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Set how many chunks of how many bytes a transcode writes.
    pub async fn set_output_chunks(&self, chunks: usize, chunk_size: usize) {
        *self.chunks.write().await = chunks.max(1);
        *self.chunk_size.write().await = chunk_size;
    }

    /// Total bytes a successful transcode writes.
    pub async fn output_size(&self) -> usize {
        *self.chunks.read().await * *self.chunk_size.read().await
    }

    /// Enable or disable progress updates during conversion.
    pub async fn set_send_progress(&self, send: bool) {
        *self.send_progress.write().await = send;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    /// Sleeps for `duration`, returning false if `cancel` fired first.
    async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn progress(job_id: &str, target: ConversionTarget, percent: f32) -> ConversionProgress {
        ConversionProgress {
            job_id: job_id.to_string(),
            target,
            percent,
            time_secs: 0.0,
            duration_secs: None,
            speed: Some("10x".to_string()),
        }
    }

    async fn write_chunks(
        &self,
        request: &TranscodeRequest,
        progress_tx: &mpsc::Sender<ConversionProgress>,
        cancel: &CancellationToken,
    ) -> Result<u64, ConverterError> {
        let chunks = *self.chunks.read().await;
        let chunk_size = *self.chunk_size.read().await;
        let send_progress = *self.send_progress.read().await;
        let step = Duration::from_millis(*self.conversion_duration_ms.read().await / chunks as u64);

        let mut file = tokio::fs::File::create(&request.output_path).await?;
        let mut written = 0u64;
        for i in 0..chunks {
            if cancel.is_cancelled() {
                return Err(ConverterError::Cancelled);
            }
            let chunk = vec![(i % 251) as u8; chunk_size];
            file.write_all(&chunk).await?;
            file.flush().await?;
            written += chunk_size as u64;

            if send_progress {
                let percent = ((i + 1) as f32 / chunks as f32) * 100.0;
                let _ = progress_tx
                    .send(Self::progress(&request.job_id, ConversionTarget::Stream, percent))
                    .await;
            }
            if !Self::pause(step, cancel).await {
                return Err(ConverterError::Cancelled);
            }
        }
        Ok(written)
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if let Some(err) = self.probe_errors.write().await.remove(path) {
            return Err(err);
        }

        // Check for pre-configured result
        if let Some(info) = self.probe_results.read().await.get(path) {
            return Ok(info.clone());
        }

        // Check for default media info
        if let Some(info) = self.default_media_info.read().await.as_ref() {
            let mut info = info.clone();
            info.path = path.to_path_buf();
            return Ok(info);
        }

        Ok(fixtures::h264_info(path))
    }

    async fn transcode(
        &self,
        request: TranscodeRequest,
        progress_tx: mpsc::Sender<ConversionProgress>,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        if let Some(err) = self.take_error().await {
            self.transcodes.write().await.push(RecordedTranscode {
                request,
                success: false,
            });
            return Err(err);
        }

        let started = std::time::Instant::now();
        let result = self.write_chunks(&request, &progress_tx, &cancel).await;
        self.transcodes.write().await.push(RecordedTranscode {
            request: request.clone(),
            success: result.is_ok(),
        });

        Ok(ConversionResult {
            job_id: request.job_id,
            target: ConversionTarget::Stream,
            outputs: vec![request.output_path],
            output_size_bytes: result?,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn extract_subtitles(
        &self,
        request: SubtitleExtraction,
        progress_tx: mpsc::Sender<ConversionProgress>,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        if let Some(err) = self.next_subtitle_error.write().await.take() {
            self.extractions.write().await.push(RecordedExtraction {
                request,
                success: false,
            });
            return Err(err);
        }

        let step = Duration::from_millis(*self.conversion_duration_ms.read().await / 5);
        let mut outputs = Vec::new();
        let mut size = 0u64;
        for (i, track) in request.tracks.iter().enumerate() {
            if !Self::pause(step, &cancel).await {
                self.extractions.write().await.push(RecordedExtraction {
                    request: request.clone(),
                    success: false,
                });
                return Err(ConverterError::Cancelled);
            }
            let body = format!("WEBVTT\n\n00:00.000 --> 00:01.000\ntrack {}\n", track.index);
            tokio::fs::write(&track.output_path, &body).await?;
            size += body.len() as u64;
            outputs.push(track.output_path.clone());

            let percent = ((i + 1) as f32 / request.tracks.len() as f32) * 100.0;
            let _ = progress_tx
                .send(Self::progress(&request.job_id, ConversionTarget::Subtitles, percent))
                .await;
        }

        self.extractions.write().await.push(RecordedExtraction {
            request: request.clone(),
            success: true,
        });
        Ok(ConversionResult {
            job_id: request.job_id,
            target: ConversionTarget::Subtitles,
            outputs,
            output_size_bytes: size,
            duration_ms: 0,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{SubtitleTrack, VideoConstraints};
    use tempfile::TempDir;

    fn request(dir: &TempDir) -> TranscodeRequest {
        TranscodeRequest {
            job_id: "job-1".to_string(),
            input_path: dir.path().join("movie.mkv"),
            output_path: dir.path().join("_movie.mkv.partial"),
            constraints: VideoConstraints::default(),
            burn_subtitle: None,
        }
    }

    #[tokio::test]
    async fn test_probe_default_is_playable_h264() {
        let converter = MockConverter::new();

        let info = converter.probe(Path::new("/test/video.mkv")).await.unwrap();
        assert_eq!(info.format, "matroska");
        assert_eq!(info.video_codec.as_deref(), Some("h264"));
        assert_eq!(info.video_height, Some(1080));
    }

    #[tokio::test]
    async fn test_probe_error_is_one_shot() {
        let converter = MockConverter::new();
        converter
            .set_probe_error("/test/video.mkv", ConverterError::probe_failed("bad"))
            .await;

        assert!(converter.probe(Path::new("/test/video.mkv")).await.is_err());
        assert!(converter.probe(Path::new("/test/video.mkv")).await.is_ok());
    }

    #[tokio::test]
    async fn test_transcode_writes_chunks_and_reports_progress() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::ZERO).await;
        converter.set_output_chunks(4, 100).await;

        let (tx, mut rx) = mpsc::channel(16);
        let result = converter
            .transcode(request(&dir), tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.output_size_bytes, 400);
        let written = std::fs::read(dir.path().join("_movie.mkv.partial")).unwrap();
        assert_eq!(written.len(), 400);

        let mut last = 0.0;
        while let Some(progress) = rx.recv().await {
            assert_eq!(progress.target, ConversionTarget::Stream);
            last = progress.percent;
        }
        assert_eq!(last, 100.0);

        let recorded = converter.recorded_transcodes().await;
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].success);
    }

    #[tokio::test]
    async fn test_transcode_honours_cancel() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::from_secs(10)).await;

        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(16);
        let handle = {
            let cancel = cancel.clone();
            let request = request(&dir);
            async move { converter.transcode(request, tx, cancel).await }
        };
        let task = tokio::spawn(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ConverterError::Cancelled)));
    }

    #[tokio::test]
    async fn test_error_injection() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter
            .set_next_error(ConverterError::conversion_failed("test error", None))
            .await;

        let (tx, _rx) = mpsc::channel(16);
        let result = converter
            .transcode(request(&dir), tx, CancellationToken::new())
            .await;
        assert!(result.is_err());

        // Error should be consumed, transcode recorded as failed
        let recorded = converter.recorded_transcodes().await;
        assert_eq!(recorded.len(), 1);
        assert!(!recorded[0].success);
    }

    #[tokio::test]
    async fn test_extract_subtitles_writes_webvtt() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::ZERO).await;

        let output = dir.path().join("movie.0.eng.vtt");
        let (tx, _rx) = mpsc::channel(16);
        let result = converter
            .extract_subtitles(
                SubtitleExtraction {
                    job_id: "job-1".to_string(),
                    input_path: dir.path().join("movie.mkv"),
                    tracks: vec![SubtitleTrack {
                        index: 0,
                        output_path: output.clone(),
                    }],
                },
                tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.outputs, vec![output.clone()]);
        assert!(std::fs::read_to_string(output).unwrap().starts_with("WEBVTT"));
    }
}
