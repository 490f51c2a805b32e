//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{
    ContainerFormat, ConversionProgress, ConversionResult, ConversionTarget, MediaInfo,
    SubtitleExtraction, SubtitleStream, TranscodeRequest, VideoFormat,
};

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
}

enum RunOutcome {
    Finished(std::io::Result<(std::process::ExitStatus, String)>),
    TimedOut,
    Cancelled,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Builds ffmpeg arguments for the streamable rendition.
    fn build_transcode_args(&self, request: &TranscodeRequest) -> Vec<String> {
        let constraints = &request.constraints;
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            request.input_path.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "0:a:0?".to_string(),
        ];

        args.extend([
            "-c:v".to_string(),
            constraints.format.ffmpeg_codec().to_string(),
        ]);

        if constraints.format != VideoFormat::Copy {
            if let Some(crf) = constraints.crf {
                args.extend(["-crf".to_string(), crf.to_string()]);
            }

            let mut filters = Vec::new();
            if let Some(height) = constraints.max_height {
                filters.push(format!("scale=-2:'min({},ih)'", height));
            }
            if let Some(index) = request.burn_subtitle {
                filters.push(format!(
                    "subtitles='{}':si={}",
                    escape_filter_path(&request.input_path),
                    index
                ));
            }
            if !filters.is_empty() {
                args.extend(["-vf".to_string(), filters.join(",")]);
            }

            if let Some(fps) = constraints.fps {
                args.extend(["-r".to_string(), fps.to_string()]);
            }
        }

        args.extend(["-c:a".to_string(), constraints.audio.ffmpeg_codec().to_string()]);
        if let Some(bitrate) = constraints.audio_bitrate_kbps {
            args.extend(["-b:a".to_string(), format!("{}k", bitrate)]);
        }

        // Subtitles are extracted separately.
        args.push("-sn".to_string());

        if constraints.container == ContainerFormat::Mp4 {
            args.extend([
                "-movflags".to_string(),
                "frag_keyframe+empty_moov".to_string(),
            ]);
        }
        args.extend([
            "-f".to_string(),
            constraints.container.muxer().to_string(),
        ]);

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(request.output_path.to_string_lossy().to_string());

        args
    }

    /// Builds ffmpeg arguments writing one WebVTT file per track.
    fn build_extract_args(&self, request: &SubtitleExtraction) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            request.input_path.to_string_lossy().to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ];

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        for track in &request.tracks {
            args.extend([
                "-map".to_string(),
                format!("0:s:{}", track.index),
                "-c:s".to_string(),
                "webvtt".to_string(),
                "-f".to_string(),
                "webvtt".to_string(),
                track.output_path.to_string_lossy().to_string(),
            ]);
        }

        args
    }

    /// Parses ffprobe JSON output into MediaInfo.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, ConverterError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: String,
            duration: Option<String>,
            size: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            channels: Option<u8>,
            width: Option<u32>,
            height: Option<u32>,
            r_frame_rate: Option<String>,
            #[serde(default)]
            tags: HashMap<String, String>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| ConverterError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let duration_secs = probe
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let size_bytes = probe
            .format
            .size
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");
        let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

        let subtitle_streams = probe
            .streams
            .iter()
            .filter(|s| s.codec_type == "subtitle")
            .enumerate()
            .map(|(ordinal, s)| SubtitleStream {
                index: ordinal as u32,
                codec: s.codec_name.clone(),
                language: s.tags.get("language").cloned(),
                title: s.tags.get("title").cloned(),
            })
            .collect();

        let format_name = probe
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("unknown");

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs,
            format: format_name.to_string(),
            audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
            audio_channels: audio_stream.and_then(|s| s.channels),
            video_codec: video_stream.and_then(|s| s.codec_name.clone()),
            video_width: video_stream.and_then(|s| s.width),
            video_height: video_stream.and_then(|s| s.height),
            video_fps: video_stream
                .and_then(|s| s.r_frame_rate.as_deref())
                .and_then(parse_frame_rate),
            subtitle_streams,
        })
    }

    /// Runs ffmpeg until it exits, times out or `cancel` fires.
    async fn run_ffmpeg(
        &self,
        job_id: &str,
        target: ConversionTarget,
        args: &[String],
        duration_secs: Option<f64>,
        progress_tx: &mpsc::Sender<ConversionProgress>,
        cancel: &CancellationToken,
    ) -> Result<(), ConverterError> {
        if cancel.is_cancelled() {
            return Err(ConverterError::Cancelled);
        }

        tracing::debug!(job_id = %job_id, ?target, args = ?args, "Spawning ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConverterError::launch("ffmpeg", &self.config.ffmpeg_path, e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConverterError::conversion_failed("stderr not captured", None))?;
        let mut reader = BufReader::new(stderr);
        let mut line_buf = Vec::new();

        let mut current_time = 0.0;
        let mut current_speed = None;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let work = async {
            let mut last_progress_send = Instant::now();
            let progress_interval = Duration::from_millis(500);
            let mut error_output = String::new();

            loop {
                let line = match next_line_lossy(&mut reader, &mut line_buf).await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(job_id = %job_id, error = %e, "ffmpeg stderr closed");
                        break;
                    }
                };
                if line.contains("Error") || line.contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }

                if let Some(re) = TIME_REGEX.as_ref() {
                    if let Some(ms) = re
                        .captures(&line)
                        .and_then(|caps| caps.get(1))
                        .and_then(|m| m.as_str().parse::<f64>().ok())
                    {
                        // out_time_ms is reported in microseconds.
                        current_time = ms / 1_000_000.0;
                    }
                }

                if let Some(re) = SPEED_REGEX.as_ref() {
                    if let Some(speed) = re.captures(&line).and_then(|caps| caps.get(1)) {
                        current_speed = Some(format!("{}x", speed.as_str()));
                    }
                }

                if last_progress_send.elapsed() >= progress_interval {
                    let progress = ConversionProgress {
                        job_id: job_id.to_string(),
                        target,
                        percent: percent_of(current_time, duration_secs),
                        time_secs: current_time,
                        duration_secs,
                        speed: current_speed.clone(),
                    };
                    let _ = progress_tx.try_send(progress);
                    last_progress_send = Instant::now();
                }
            }

            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, error_output))
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => RunOutcome::Cancelled,
            result = timeout(timeout_duration, work) => match result {
                Ok(finished) => RunOutcome::Finished(finished),
                Err(_) => RunOutcome::TimedOut,
            },
        };

        match outcome {
            RunOutcome::Finished(Ok((status, error_output))) => {
                if !status.success() {
                    return Err(ConverterError::conversion_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
                Ok(())
            }
            RunOutcome::Finished(Err(e)) => Err(ConverterError::Io(e)),
            RunOutcome::TimedOut => {
                let _ = child.kill().await;
                Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
            RunOutcome::Cancelled => {
                tracing::info!(job_id = %job_id, ?target, "Stopping ffmpeg: cancelled");
                let _ = child.kill().await;
                Err(ConverterError::Cancelled)
            }
        }
    }

    async fn ensure_parent(path: &Path) -> Result<(), ConverterError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConverterError::OutputDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        Ok(())
    }

    async fn total_size(paths: &[PathBuf]) -> u64 {
        let mut total = 0;
        for path in paths {
            if let Ok(meta) = tokio::fs::metadata(path).await {
                total += meta.len();
            }
        }
        total
    }
}

static TIME_REGEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"out_time_ms=(\d+)").ok());
static SPEED_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"speed=\s*(\d+\.?\d*)x").ok());

/// Next `\n`-terminated line with invalid UTF-8 replaced; `None` at EOF.
async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn parse_frame_rate(rate: &str) -> Option<f32> {
    // "24000/1001" or "30/1"
    match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f32>().ok()?;
            let den = den.parse::<f32>().ok()?;
            if den > 0.0 {
                Some(num / den)
            } else {
                None
            }
        }
        None => rate.parse::<f32>().ok(),
    }
}

fn percent_of(time_secs: f64, duration_secs: Option<f64>) -> f32 {
    match duration_secs {
        Some(dur) if dur > 0.0 => (time_secs / dur * 100.0).clamp(0.0, 100.0) as f32,
        _ => 0.0,
    }
}

/// Escapes a path for use inside a quoted filtergraph argument.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if !path.exists() {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let run = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output();

        let output = timeout(Duration::from_secs(self.config.probe_timeout_secs), run)
            .await
            .map_err(|_| ConverterError::Timeout {
                timeout_secs: self.config.probe_timeout_secs,
            })?
            .map_err(|e| ConverterError::launch("ffprobe", &self.config.ffprobe_path, e))?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn transcode(
        &self,
        request: TranscodeRequest,
        progress_tx: mpsc::Sender<ConversionProgress>,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        if !request.input_path.exists() {
            return Err(ConverterError::InputNotFound {
                path: request.input_path.clone(),
            });
        }
        Self::ensure_parent(&request.output_path).await?;

        let duration_secs = self
            .probe(&request.input_path)
            .await
            .ok()
            .map(|info| info.duration_secs);

        let args = self.build_transcode_args(&request);
        self.run_ffmpeg(
            &request.job_id,
            ConversionTarget::Stream,
            &args,
            duration_secs,
            &progress_tx,
            &cancel,
        )
        .await?;

        let output_meta = tokio::fs::metadata(&request.output_path)
            .await
            .map_err(|_| ConverterError::conversion_failed("Output file not created", None))?;

        Ok(ConversionResult {
            job_id: request.job_id,
            target: ConversionTarget::Stream,
            outputs: vec![request.output_path],
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn extract_subtitles(
        &self,
        request: SubtitleExtraction,
        progress_tx: mpsc::Sender<ConversionProgress>,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        if request.tracks.is_empty() {
            return Ok(ConversionResult {
                job_id: request.job_id,
                target: ConversionTarget::Subtitles,
                outputs: Vec::new(),
                output_size_bytes: 0,
                duration_ms: 0,
            });
        }
        if !request.input_path.exists() {
            return Err(ConverterError::InputNotFound {
                path: request.input_path.clone(),
            });
        }
        for track in &request.tracks {
            Self::ensure_parent(&track.output_path).await?;
        }

        let duration_secs = self
            .probe(&request.input_path)
            .await
            .ok()
            .map(|info| info.duration_secs);

        let args = self.build_extract_args(&request);
        self.run_ffmpeg(
            &request.job_id,
            ConversionTarget::Subtitles,
            &args,
            duration_secs,
            &progress_tx,
            &cancel,
        )
        .await
        .map_err(|e| match e {
            ConverterError::ConversionFailed { reason, .. } => ConverterError::subtitle_failed(reason),
            other => other,
        })?;

        let outputs: Vec<PathBuf> = request
            .tracks
            .iter()
            .map(|track| track.output_path.clone())
            .collect();
        if let Some(missing) = outputs.iter().find(|path| !path.exists()) {
            return Err(ConverterError::subtitle_failed(format!(
                "Subtitle file not created: {}",
                missing.display()
            )));
        }

        Ok(ConversionResult {
            job_id: request.job_id,
            target: ConversionTarget::Subtitles,
            output_size_bytes: Self::total_size(&outputs).await,
            outputs,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        for (tool, path) in [
            ("ffmpeg", &self.config.ffmpeg_path),
            ("ffprobe", &self.config.ffprobe_path),
        ] {
            Command::new(path)
                .arg("-version")
                .output()
                .await
                .map_err(|e| ConverterError::launch(tool, path, e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::types::{SubtitleTrack, VideoConstraints};

    #[tokio::test]
    async fn test_stderr_lines_survive_invalid_utf8() {
        let mut stderr: &[u8] = b"frame=1\nencoder \xff\xfe tag\r\nout_time_ms=5000000\nspeed=1.5x";
        let mut buf = Vec::new();
        let mut lines = Vec::new();
        while let Some(line) = next_line_lossy(&mut stderr, &mut buf).await.unwrap() {
            lines.push(line);
        }

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "frame=1");
        assert!(lines[1].starts_with("encoder ") && lines[1].ends_with(" tag"));
        assert!(lines[1].contains('\u{fffd}'));
        let caps = TIME_REGEX.as_ref().unwrap().captures(&lines[2]).unwrap();
        assert_eq!(&caps[1], "5000000");
        let caps = SPEED_REGEX.as_ref().unwrap().captures(&lines[3]).unwrap();
        assert_eq!(&caps[1], "1.5");
    }

    fn transcode_request(constraints: VideoConstraints) -> TranscodeRequest {
        TranscodeRequest {
            job_id: "job-1".to_string(),
            input_path: PathBuf::from("/movies/movie.avi"),
            output_path: PathBuf::from("/movies/_movie.mkv.partial"),
            constraints,
            burn_subtitle: None,
        }
    }

    #[test]
    fn test_build_transcode_args() {
        let converter = FfmpegConverter::with_defaults();
        let args = converter.build_transcode_args(&transcode_request(VideoConstraints::default()));

        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"-crf".to_string()));
        assert!(args.contains(&"23".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"192k".to_string()));
        assert!(args.contains(&"scale=-2:'min(1080,ih)'".to_string()));
        // Output has a temporary extension so the muxer must be explicit.
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "matroska");
        assert_eq!(args.last().unwrap(), "/movies/_movie.mkv.partial");
    }

    #[test]
    fn test_build_transcode_args_mp4_is_fragmented() {
        let converter = FfmpegConverter::with_defaults();
        let args = converter.build_transcode_args(&transcode_request(VideoConstraints {
            container: ContainerFormat::Mp4,
            ..Default::default()
        }));

        assert!(args.contains(&"frag_keyframe+empty_moov".to_string()));
        assert!(args.contains(&"mp4".to_string()));
    }

    #[test]
    fn test_build_transcode_args_burn_in() {
        let converter = FfmpegConverter::with_defaults();
        let mut request = transcode_request(VideoConstraints::default());
        request.burn_subtitle = Some(2);

        let args = converter.build_transcode_args(&request);
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(
            args[vf + 1],
            "scale=-2:'min(1080,ih)',subtitles='/movies/movie.avi':si=2"
        );
    }

    #[test]
    fn test_build_transcode_args_copy_skips_filters() {
        let converter = FfmpegConverter::with_defaults();
        let args = converter.build_transcode_args(&transcode_request(VideoConstraints {
            format: VideoFormat::Copy,
            ..Default::default()
        }));

        assert!(!args.contains(&"-vf".to_string()));
        assert!(!args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_build_extract_args() {
        let converter = FfmpegConverter::with_defaults();
        let request = SubtitleExtraction {
            job_id: "job-1".to_string(),
            input_path: PathBuf::from("/movies/movie.mkv"),
            tracks: vec![
                SubtitleTrack {
                    index: 0,
                    output_path: PathBuf::from("/movies/movie.0.eng.vtt"),
                },
                SubtitleTrack {
                    index: 2,
                    output_path: PathBuf::from("/movies/movie.2.fre.vtt"),
                },
            ],
        };

        let args = converter.build_extract_args(&request);
        assert!(args.contains(&"0:s:0".to_string()));
        assert!(args.contains(&"0:s:2".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "webvtt").count(), 4);
        assert_eq!(args.last().unwrap(), "/movies/movie.2.fre.vtt");
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("/media/it's:here.mkv")),
            "/media/it\\'s\\:here.mkv"
        );
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(30.0, Some(60.0)), 50.0);
        assert_eq!(percent_of(90.0, Some(60.0)), 100.0);
        assert_eq!(percent_of(30.0, None), 0.0);
        assert_eq!(percent_of(30.0, Some(0.0)), 0.0);
    }

    #[test]
    fn test_parse_probe_output_video() {
        let json = r#"{
            "format": {
                "filename": "test.mkv",
                "format_name": "matroska,webm",
                "duration": "7200.0",
                "size": "5000000000"
            },
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "24000/1001"
                },
                {
                    "codec_type": "audio",
                    "codec_name": "aac",
                    "channels": 6
                },
                {
                    "codec_type": "subtitle",
                    "codec_name": "subrip",
                    "tags": { "language": "eng", "title": "English" }
                },
                {
                    "codec_type": "subtitle",
                    "codec_name": "hdmv_pgs_subtitle",
                    "tags": { "language": "fre" }
                }
            ]
        }"#;

        let info = FfmpegConverter::parse_probe_output(Path::new("test.mkv"), json).unwrap();
        assert_eq!(info.format, "matroska");
        assert_eq!(info.size_bytes, 5_000_000_000);
        assert_eq!(info.video_codec, Some("h264".to_string()));
        assert_eq!(info.video_height, Some(1080));
        let fps = info.video_fps.unwrap();
        assert!((fps - 23.976).abs() < 0.01);
        assert_eq!(info.audio_channels, Some(6));

        assert_eq!(info.subtitle_streams.len(), 2);
        assert_eq!(info.subtitle_streams[0].index, 0);
        assert_eq!(info.subtitle_streams[0].language.as_deref(), Some("eng"));
        assert!(info.subtitle_streams[0].is_text());
        assert_eq!(info.subtitle_streams[1].index, 1);
        assert!(!info.subtitle_streams[1].is_text());
    }

    #[test]
    fn test_parse_probe_output_rejects_garbage() {
        let result = FfmpegConverter::parse_probe_output(Path::new("x.mkv"), "not json");
        assert!(matches!(result, Err(ConverterError::ParseError { .. })));
    }

    #[tokio::test]
    async fn test_probe_missing_input() {
        let converter = FfmpegConverter::with_defaults();
        let result = converter.probe(Path::new("/nonexistent/movie.mkv")).await;
        assert!(matches!(result, Err(ConverterError::InputNotFound { .. })));
    }

    #[tokio::test]
    async fn test_transcode_cancelled_before_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.avi");
        std::fs::write(&input, b"not really video").unwrap();

        let converter = FfmpegConverter::new(ConverterConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        ));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, _rx) = mpsc::channel(4);

        let mut request = transcode_request(VideoConstraints::default());
        request.input_path = input;
        request.output_path = dir.path().join("_movie.mkv.partial");

        let result = converter.transcode(request, tx, cancel).await;
        assert!(matches!(result, Err(ConverterError::Cancelled)));
    }

    #[tokio::test]
    async fn test_validate_missing_binary() {
        let converter = FfmpegConverter::new(ConverterConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        ));
        let result = converter.validate().await;
        assert!(matches!(result, Err(ConverterError::ToolNotFound { tool: "ffmpeg", .. })));
    }
}
