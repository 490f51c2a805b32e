//! Playback acceptance criteria.

use serde::{Deserialize, Serialize};

use super::types::MediaInfo;

/// What a client can play without conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackProfile {
    /// Tallest accepted picture.
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    /// Highest accepted frame rate.
    #[serde(default = "default_max_fps")]
    pub max_fps: f32,
    /// Accepted video codecs as reported by ffprobe.
    #[serde(default = "default_video_codecs")]
    pub video_codecs: Vec<String>,
    /// Accepted audio codecs as reported by ffprobe.
    #[serde(default = "default_audio_codecs")]
    pub audio_codecs: Vec<String>,
    /// Accepted containers (first name of the ffprobe format list).
    #[serde(default = "default_containers")]
    pub containers: Vec<String>,
}

fn default_max_height() -> u32 {
    1080
}

fn default_max_fps() -> f32 {
    60.0
}

fn default_video_codecs() -> Vec<String> {
    vec!["h264".to_string()]
}

fn default_audio_codecs() -> Vec<String> {
    ["aac", "mp3", "opus", "vorbis"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_containers() -> Vec<String> {
    ["matroska", "mov", "webm"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for PlaybackProfile {
    fn default() -> Self {
        Self {
            max_height: default_max_height(),
            max_fps: default_max_fps(),
            video_codecs: default_video_codecs(),
            audio_codecs: default_audio_codecs(),
            containers: default_containers(),
        }
    }
}

impl PlaybackProfile {
    /// Why `info` would need a conversion, or `None` when it plays as is.
    pub fn rejection_reason(&self, info: &MediaInfo) -> Option<String> {
        let Some(video_codec) = info.video_codec.as_deref() else {
            return Some("no video stream".to_string());
        };
        if !contains(&self.video_codecs, video_codec) {
            return Some(format!("video codec {} not accepted", video_codec));
        }
        if let Some(audio_codec) = info.audio_codec.as_deref() {
            if !contains(&self.audio_codecs, audio_codec) {
                return Some(format!("audio codec {} not accepted", audio_codec));
            }
        }
        if !contains(&self.containers, &info.format) {
            return Some(format!("container {} not accepted", info.format));
        }
        if let Some(height) = info.video_height {
            if height > self.max_height {
                return Some(format!("height {} above {}", height, self.max_height));
            }
        }
        if let Some(fps) = info.video_fps {
            if fps > self.max_fps {
                return Some(format!("frame rate {:.2} above {}", fps, self.max_fps));
            }
        }
        None
    }

    /// Whether `info` plays without conversion.
    pub fn accepts(&self, info: &MediaInfo) -> bool {
        self.rejection_reason(info).is_none()
    }
}

fn contains(list: &[String], value: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn info(codec: &str, height: u32, fps: f32) -> MediaInfo {
        MediaInfo {
            path: PathBuf::from("/movies/movie.mkv"),
            size_bytes: 1024,
            duration_secs: 5400.0,
            format: "matroska".to_string(),
            audio_codec: Some("aac".to_string()),
            audio_channels: Some(2),
            video_codec: Some(codec.to_string()),
            video_width: None,
            video_height: Some(height),
            video_fps: Some(fps),
            subtitle_streams: Vec::new(),
        }
    }

    #[test]
    fn test_accepts_h264_1080p() {
        let profile = PlaybackProfile::default();
        assert!(profile.accepts(&info("h264", 1080, 23.976)));
    }

    #[test]
    fn test_rejects_hevc_4k() {
        let profile = PlaybackProfile::default();
        let reason = profile.rejection_reason(&info("hevc", 2160, 24.0)).unwrap();
        assert!(reason.contains("hevc"));

        let reason = profile.rejection_reason(&info("h264", 2160, 24.0)).unwrap();
        assert!(reason.contains("height"));
    }

    #[test]
    fn test_rejects_high_frame_rate() {
        let profile = PlaybackProfile::default();
        assert!(!profile.accepts(&info("h264", 720, 120.0)));
    }

    #[test]
    fn test_rejects_missing_video() {
        let profile = PlaybackProfile::default();
        let mut audio_only = info("h264", 0, 0.0);
        audio_only.video_codec = None;
        assert!(!profile.accepts(&audio_only));
    }

    #[test]
    fn test_codec_match_ignores_case() {
        let profile = PlaybackProfile::default();
        assert!(profile.accepts(&info("H264", 480, 25.0)));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
            max_height = 2160
            video_codecs = ["h264", "hevc"]
        "#;
        let profile: PlaybackProfile = toml::from_str(toml).unwrap();
        assert_eq!(profile.max_height, 2160);
        assert_eq!(profile.max_fps, 60.0);
        assert!(profile.accepts(&info("hevc", 2160, 24.0)));
    }
}
