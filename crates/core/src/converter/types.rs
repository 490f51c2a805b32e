//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which output a conversion step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionTarget {
    /// The video/audio stream (safe to read progressively).
    Stream,
    /// Extracted subtitle files.
    Subtitles,
}

/// Audio codec for the converted stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// Advanced Audio Coding
    Aac,
    /// MPEG Audio Layer III
    Mp3,
    /// Opus
    Opus,
    /// Copy (no re-encoding)
    Copy,
}

impl AudioFormat {
    /// Returns the ffmpeg codec name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "libmp3lame",
            Self::Opus => "libopus",
            Self::Copy => "copy",
        }
    }
}

/// Video codec for the converted stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoFormat {
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// VP9
    Vp9,
    /// Copy (no re-encoding)
    Copy,
}

impl VideoFormat {
    /// Returns the ffmpeg codec name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
            Self::Vp9 => "libvpx-vp9",
            Self::Copy => "copy",
        }
    }
}

/// Container format for output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    /// Matroska (.mkv)
    Mkv,
    /// MPEG-4 Part 14 (.mp4), written fragmented
    Mp4,
    /// WebM
    Webm,
}

impl ContainerFormat {
    /// Returns the file extension for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mkv => "mkv",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }

    /// Muxer name passed to `-f`; needed because outputs are written under
    /// a temporary extension.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Mkv => "matroska",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }
}

/// Constraints for the converted stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConstraints {
    /// Target video codec.
    pub format: VideoFormat,
    /// Target container.
    pub container: ContainerFormat,
    /// Constant Rate Factor (quality, lower = better, 0-51 for x264/x265).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u8>,
    /// Maximum height (width scaled proportionally).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    /// Target frame rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    /// Audio codec for the output.
    pub audio: AudioFormat,
    /// Audio bitrate in kbps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bitrate_kbps: Option<u32>,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            format: VideoFormat::H264,
            container: ContainerFormat::Mkv,
            crf: Some(23),
            max_height: Some(1080),
            fps: None,
            audio: AudioFormat::Aac,
            audio_bitrate_kbps: Some(192),
        }
    }
}

/// Request to produce a streamable rendition of a file.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Job ID used in progress reports.
    pub job_id: String,
    pub input_path: PathBuf,
    /// Where the encoder writes (usually a temporary path).
    pub output_path: PathBuf,
    pub constraints: VideoConstraints,
    /// Subtitle stream ordinal to burn into the picture.
    pub burn_subtitle: Option<u32>,
}

/// One subtitle track to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    /// Ordinal among the subtitle streams of the input.
    pub index: u32,
    pub output_path: PathBuf,
}

/// Request to extract text subtitles to WebVTT files.
#[derive(Debug, Clone)]
pub struct SubtitleExtraction {
    pub job_id: String,
    pub input_path: PathBuf,
    pub tracks: Vec<SubtitleTrack>,
}

/// Result of a successful conversion step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Job ID.
    pub job_id: String,
    pub target: ConversionTarget,
    /// Files written by the step.
    pub outputs: Vec<PathBuf>,
    /// Total size of the outputs in bytes.
    pub output_size_bytes: u64,
    /// Conversion duration in milliseconds.
    pub duration_ms: u64,
}

/// A subtitle stream found while probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleStream {
    /// Ordinal among the subtitle streams.
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SubtitleStream {
    /// Text tracks can be extracted; bitmap tracks can only be burned in.
    pub fn is_text(&self) -> bool {
        matches!(
            self.codec.as_deref(),
            Some("subrip" | "srt" | "ass" | "ssa" | "webvtt" | "mov_text" | "text")
        )
    }
}

/// Information about a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// File path.
    pub path: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Container format (e.g., "matroska", "mov").
    pub format: String,
    /// Audio codec (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    /// Audio channels (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u8>,
    /// Video codec (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    /// Video width (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_width: Option<u32>,
    /// Video height (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_height: Option<u32>,
    /// Video frame rate (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_fps: Option<f32>,
    /// Subtitle streams, in file order.
    #[serde(default)]
    pub subtitle_streams: Vec<SubtitleStream>,
}

/// Progress update during conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Job ID.
    pub job_id: String,
    /// Which output is being produced.
    pub target: ConversionTarget,
    /// Progress percentage (0.0 - 100.0).
    pub percent: f32,
    /// Current processing time in seconds.
    pub time_secs: f64,
    /// Estimated total duration in seconds.
    pub duration_secs: Option<f64>,
    /// Current processing speed (e.g., "1.5x").
    pub speed: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_format_codec() {
        assert_eq!(VideoFormat::H264.ffmpeg_codec(), "libx264");
        assert_eq!(VideoFormat::H265.ffmpeg_codec(), "libx265");
        assert_eq!(VideoFormat::Copy.ffmpeg_codec(), "copy");
    }

    #[test]
    fn test_container_extension() {
        assert_eq!(ContainerFormat::Mkv.extension(), "mkv");
        assert_eq!(ContainerFormat::Mp4.extension(), "mp4");
        assert_eq!(ContainerFormat::Mkv.muxer(), "matroska");
    }

    #[test]
    fn test_subtitle_stream_is_text() {
        let mut stream = SubtitleStream {
            index: 0,
            codec: Some("subrip".to_string()),
            language: Some("eng".to_string()),
            title: None,
        };
        assert!(stream.is_text());

        stream.codec = Some("hdmv_pgs_subtitle".to_string());
        assert!(!stream.is_text());

        stream.codec = None;
        assert!(!stream.is_text());
    }

    #[test]
    fn test_default_constraints_are_streamable() {
        let constraints = VideoConstraints::default();
        assert_eq!(constraints.format, VideoFormat::H264);
        assert_eq!(constraints.audio, AudioFormat::Aac);
        assert_eq!(constraints.max_height, Some(1080));
    }

    #[test]
    fn test_conversion_target_serialization() {
        assert_eq!(
            serde_json::to_string(&ConversionTarget::Stream).unwrap(),
            "\"stream\""
        );
        assert_eq!(
            serde_json::to_string(&ConversionTarget::Subtitles).unwrap(),
            "\"subtitles\""
        );
    }
}
