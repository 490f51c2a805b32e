//! Converter module: the external media engine.
//!
//! This module provides the `Converter` trait and an FFmpeg implementation
//! that probes files and produces the two outputs a conversion job needs:
//! a streamable rendition and WebVTT subtitle files.
//!
//! # Features
//!
//! - Probing with ffprobe (codecs, resolution, frame rate, subtitle streams)
//! - Transcoding to a progressively readable container
//! - Burning a subtitle stream into the picture
//! - Extracting text subtitles to WebVTT
//! - Progress reporting and cancellation
//!
//! # Example
//!
//! ```ignore
//! use mediashelf_core::converter::{Converter, FfmpegConverter, TranscodeRequest, VideoConstraints};
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! let info = converter.probe(Path::new("/movies/movie.avi")).await?;
//! println!("Duration: {} seconds", info.duration_secs);
//!
//! let request = TranscodeRequest {
//!     job_id: "job-1".to_string(),
//!     input_path: PathBuf::from("/movies/movie.avi"),
//!     output_path: PathBuf::from("/movies/_movie.mkv.partial"),
//!     constraints: VideoConstraints::default(),
//!     burn_subtitle: None,
//! };
//! let (tx, _rx) = mpsc::channel(16);
//! let result = converter.transcode(request, tx, CancellationToken::new()).await?;
//! println!("Converted in {} ms", result.duration_ms);
//! ```

mod config;
mod error;
mod ffmpeg;
mod profile;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use profile::PlaybackProfile;
pub use traits::Converter;
pub use types::{
    AudioFormat, ContainerFormat, ConversionProgress, ConversionResult, ConversionTarget,
    MediaInfo, SubtitleExtraction, SubtitleStream, SubtitleTrack, TranscodeRequest,
    VideoConstraints, VideoFormat,
};
