//! Settings for the ffmpeg-backed engine (`[converter]` in the config file).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::types::VideoConstraints;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Upper bound for one transcode or extraction run. Full-length films
    /// in software x264 can take hours.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Passed to ffmpeg as `-loglevel`. Progress parsing needs `-stats`
    /// output only, so anything from `error` upward works.
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Appended after the global options of every ffmpeg invocation,
    /// e.g. `["-hwaccel", "auto"]`.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,

    /// Shape of the streamable rendition (`[converter.video]`).
    #[serde(default)]
    pub video: VideoConstraints,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_timeout() -> u64 {
    6 * 3600
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "warning".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
            video: VideoConstraints::default(),
        }
    }
}

impl ConverterConfig {
    /// Defaults with explicit locations for both executables.
    pub fn with_paths(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ContainerFormat, VideoFormat};

    #[test]
    fn test_defaults_resolve_from_path() {
        let config = ConverterConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.timeout_secs, 21600);
        assert!(config.extra_ffmpeg_args.is_empty());
    }

    #[test]
    fn test_with_paths_keeps_other_defaults() {
        let config = ConverterConfig::with_paths("/usr/local/bin/ffmpeg", "/usr/local/bin/ffprobe");
        assert_eq!(config.ffprobe_path, PathBuf::from("/usr/local/bin/ffprobe"));
        assert_eq!(config.probe_timeout_secs, 30);
        assert_eq!(config.ffmpeg_log_level, "warning");
    }

    #[test]
    fn test_deserialize_partial_video_section() {
        let toml = r#"
            ffmpeg_path = "/opt/ffmpeg"
            extra_ffmpeg_args = ["-hwaccel", "auto"]

            [video]
            format = "vp9"
            container = "webm"
            audio = "opus"
        "#;
        let config: ConverterConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(config.extra_ffmpeg_args, vec!["-hwaccel", "auto"]);
        assert_eq!(config.video.format, VideoFormat::Vp9);
        assert_eq!(config.video.container, ContainerFormat::Webm);
        assert_eq!(config.video.crf, None);
    }
}
