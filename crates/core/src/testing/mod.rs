//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external engine and
//! metadata traits, allowing the whole library lifecycle to be exercised
//! without ffmpeg or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediashelf_core::testing::{fixtures, MockConverter};
//!
//! let converter = Arc::new(MockConverter::new());
//! converter.set_probe_result(&path, fixtures::hevc_4k_info(&path)).await;
//!
//! let service = LibraryService::new(&config, converter.clone());
//! ```

mod mock_converter;
mod mock_metadata;

pub use mock_converter::{MockConverter, RecordedExtraction, RecordedTranscode};
pub use mock_metadata::MockMetadataProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::converter::{MediaInfo, SubtitleStream};

    /// Create stream info for a two-hour Matroska video.
    pub fn media_info(path: impl AsRef<Path>, video_codec: &str, height: u32) -> MediaInfo {
        MediaInfo {
            path: path.as_ref().to_path_buf(),
            size_bytes: 100 * 1024 * 1024, // 100 MB
            duration_secs: 7200.0,
            format: "matroska".to_string(),
            audio_codec: Some("aac".to_string()),
            audio_channels: Some(2),
            video_codec: Some(video_codec.to_string()),
            video_width: Some(height * 16 / 9),
            video_height: Some(height),
            video_fps: Some(24.0),
            subtitle_streams: Vec::new(),
        }
    }

    /// A file every default playback profile accepts.
    pub fn h264_info(path: impl AsRef<Path>) -> MediaInfo {
        media_info(path, "h264", 1080)
    }

    /// A file that needs a transcode.
    pub fn hevc_4k_info(path: impl AsRef<Path>) -> MediaInfo {
        media_info(path, "hevc", 2160)
    }

    /// Adds one text subtitle stream per language.
    pub fn with_subtitles(mut info: MediaInfo, languages: &[&str]) -> MediaInfo {
        info.subtitle_streams = languages
            .iter()
            .enumerate()
            .map(|(index, language)| SubtitleStream {
                index: index as u32,
                codec: Some("subrip".to_string()),
                language: Some(language.to_string()),
                title: None,
            })
            .collect();
        info
    }
}
