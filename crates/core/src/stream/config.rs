//! Configuration for progressive streaming.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for readers of an in-progress output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Bytes the temporary output must exceed before buffering reports ready.
    #[serde(default = "default_min_buffer_bytes")]
    pub min_buffer_bytes: u64,

    /// How often waiting readers re-check the file.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for a single copy chunk.
    #[serde(default = "default_chunk_size_bytes")]
    pub chunk_size_bytes: usize,

    /// How long a vanished temporary file may wait for completion to be flagged.
    #[serde(default = "default_swap_grace_ms")]
    pub swap_grace_ms: u64,
}

fn default_min_buffer_bytes() -> u64 {
    1024 * 1024
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_chunk_size_bytes() -> usize {
    64 * 1024
}

fn default_swap_grace_ms() -> u64 {
    2000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_buffer_bytes: default_min_buffer_bytes(),
            poll_interval_ms: default_poll_interval_ms(),
            chunk_size_bytes: default_chunk_size_bytes(),
            swap_grace_ms: default_swap_grace_ms(),
        }
    }
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn swap_grace(&self) -> Duration {
        Duration::from_millis(self.swap_grace_ms)
    }
}
