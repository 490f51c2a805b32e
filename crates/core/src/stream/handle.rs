use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::config::StreamConfig;
use super::error::StreamError;
use super::reader::ProgressiveReader;

/// Output of a running conversion that consumers may read while it grows.
///
/// The completed flag is set at most once, and only after the final path
/// exists. From then on the final file is treated as immutable.
#[derive(Debug)]
pub struct ProgressiveStreamHandle {
    temp_path: PathBuf,
    final_path: PathBuf,
    completed: AtomicBool,
    aborted: AtomicBool,
    config: StreamConfig,
}

impl ProgressiveStreamHandle {
    pub fn new(temp_path: PathBuf, final_path: PathBuf, config: StreamConfig) -> Self {
        Self {
            temp_path,
            final_path,
            completed: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            config,
        }
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// The file a new reader should open right now.
    pub fn current_path(&self) -> &Path {
        if self.is_complete() {
            &self.final_path
        } else {
            &self.temp_path
        }
    }

    /// Waits until enough bytes are buffered to start playback.
    ///
    /// Returns true once the temporary file exceeds the minimum size or
    /// writing completed, false on timeout or abort.
    pub async fn buffering(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_complete() {
                return true;
            }
            if self.is_aborted() {
                return false;
            }
            if let Ok(meta) = tokio::fs::metadata(&self.temp_path).await {
                if meta.len() > self.config.min_buffer_bytes {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                tracing::debug!(
                    path = %self.temp_path.display(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Buffering timed out"
                );
                return false;
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Flags writing as finished. The final file must already exist.
    pub async fn complete(&self) -> Result<(), StreamError> {
        if self.is_complete() {
            return Ok(());
        }
        if !tokio::fs::try_exists(&self.final_path).await? {
            return Err(StreamError::FinalMissing {
                path: self.final_path.clone(),
            });
        }
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::debug!(path = %self.final_path.display(), "Stream completed");
        }
        Ok(())
    }

    /// Marks the output as abandoned; waiting readers fail with `Aborted`.
    pub fn abort(&self) {
        if !self.is_complete() && !self.aborted.swap(true, Ordering::AcqRel) {
            tracing::debug!(path = %self.temp_path.display(), "Stream aborted");
        }
    }

    /// Opens a reader starting at offset zero.
    pub fn reader(self: &Arc<Self>) -> ProgressiveReader {
        ProgressiveReader::new(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handle(dir: &TempDir, config: StreamConfig) -> ProgressiveStreamHandle {
        ProgressiveStreamHandle::new(
            dir.path().join("_movie.mkv.partial"),
            dir.path().join("_movie.mkv"),
            config,
        )
    }

    fn fast_config() -> StreamConfig {
        StreamConfig {
            min_buffer_bytes: 16,
            poll_interval_ms: 5,
            chunk_size_bytes: 8,
            swap_grace_ms: 50,
        }
    }

    #[tokio::test]
    async fn test_complete_requires_final_file() {
        let dir = TempDir::new().unwrap();
        let handle = handle(&dir, fast_config());

        let result = handle.complete().await;
        assert!(matches!(result, Err(StreamError::FinalMissing { .. })));
        assert!(!handle.is_complete());

        std::fs::write(handle.final_path(), b"done").unwrap();
        handle.complete().await.unwrap();
        assert!(handle.is_complete());
        assert_eq!(handle.current_path(), handle.final_path());
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let handle = handle(&dir, fast_config());
        std::fs::write(handle.final_path(), b"done").unwrap();

        handle.complete().await.unwrap();
        std::fs::remove_file(handle.final_path()).unwrap();
        // Already complete: no re-check.
        handle.complete().await.unwrap();
        assert!(handle.is_complete());
    }

    #[tokio::test]
    async fn test_buffering_ready_above_threshold() {
        let dir = TempDir::new().unwrap();
        let handle = handle(&dir, fast_config());
        std::fs::write(handle.temp_path(), vec![0u8; 17]).unwrap();

        assert!(handle.buffering(Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn test_buffering_times_out_below_threshold() {
        let dir = TempDir::new().unwrap();
        let handle = handle(&dir, fast_config());
        std::fs::write(handle.temp_path(), vec![0u8; 16]).unwrap();

        assert!(!handle.buffering(Duration::from_millis(30)).await);
    }

    #[tokio::test]
    async fn test_buffering_ready_when_complete() {
        let dir = TempDir::new().unwrap();
        let handle = handle(&dir, fast_config());
        std::fs::write(handle.final_path(), b"short").unwrap();
        handle.complete().await.unwrap();

        assert!(handle.buffering(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_abort_after_complete_is_ignored() {
        let dir = TempDir::new().unwrap();
        let handle = handle(&dir, fast_config());
        std::fs::write(handle.final_path(), b"done").unwrap();
        handle.complete().await.unwrap();

        handle.abort();
        assert!(!handle.is_aborted());
    }
}
