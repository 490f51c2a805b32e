use std::io::SeekFrom;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::error::StreamError;
use super::handle::ProgressiveStreamHandle;

/// Sequential reader over a [`ProgressiveStreamHandle`].
///
/// `position` only grows. After completion the reader reopens the final file
/// and seeks to `position`, so every byte is delivered exactly once.
pub struct ProgressiveReader {
    handle: Arc<ProgressiveStreamHandle>,
    position: u64,
    file: Option<File>,
    on_final: bool,
}

impl ProgressiveReader {
    pub(crate) fn new(handle: Arc<ProgressiveStreamHandle>) -> Self {
        Self {
            handle,
            position: 0,
            file: None,
            on_final: false,
        }
    }

    /// Bytes delivered so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn handle(&self) -> &Arc<ProgressiveStreamHandle> {
        &self.handle
    }

    /// Reads the next bytes, waiting while the writer is behind.
    ///
    /// Returns `Ok(0)` only once the final file has been read to its end.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            self.ensure_open().await?;
            let Some(file) = self.file.as_mut() else {
                continue;
            };

            // Clamp to the size of the file currently open.
            let len = file.metadata().await?.len();
            let available = len.saturating_sub(self.position);
            if available > 0 {
                let want = buf.len().min(available as usize);
                let n = file.read(&mut buf[..want]).await?;
                if n > 0 {
                    self.position += n as u64;
                    return Ok(n);
                }
            }

            if self.on_final {
                return Ok(0);
            }
            if self.handle.is_complete() {
                self.switch_to_final();
                continue;
            }
            if self.handle.is_aborted() {
                return Err(StreamError::aborted(self.handle.temp_path()));
            }
            tokio::time::sleep(self.handle.config().poll_interval()).await;
        }
    }

    /// Copies everything to `dest`, flushing after each chunk.
    pub async fn copy_to<W>(&mut self, dest: &mut W) -> Result<u64, StreamError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; self.handle.config().chunk_size_bytes.max(1)];
        let mut copied = 0u64;
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            dest.write_all(&buf[..n]).await?;
            dest.flush().await?;
            copied += n as u64;
        }
        Ok(copied)
    }

    /// Reads until the final file is exhausted.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        self.copy_to(&mut out).await?;
        Ok(out)
    }

    fn switch_to_final(&mut self) {
        tracing::trace!(
            position = self.position,
            path = %self.handle.final_path().display(),
            "Switching reader to final file"
        );
        self.file = None;
        self.on_final = true;
    }

    async fn ensure_open(&mut self) -> Result<(), StreamError> {
        if self.file.is_some() {
            return Ok(());
        }
        if self.handle.is_complete() {
            self.on_final = true;
        }

        let mut file = if self.on_final {
            File::open(self.handle.final_path()).await?
        } else {
            match File::open(self.handle.temp_path()).await {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Either renamed just before completion is flagged, or gone.
                    self.wait_for_completion().await?;
                    self.on_final = true;
                    File::open(self.handle.final_path()).await?
                }
                Err(e) => return Err(e.into()),
            }
        };

        if self.position > 0 {
            file.seek(SeekFrom::Start(self.position)).await?;
        }
        self.file = Some(file);
        Ok(())
    }

    async fn wait_for_completion(&self) -> Result<(), StreamError> {
        let deadline = Instant::now() + self.handle.config().swap_grace();
        loop {
            if self.handle.is_complete() {
                return Ok(());
            }
            if self.handle.is_aborted() || Instant::now() >= deadline {
                return Err(StreamError::aborted(self.handle.temp_path()));
            }
            tokio::time::sleep(self.handle.config().poll_interval()).await;
        }
    }
}
