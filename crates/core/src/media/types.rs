//! Types for media entities.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::converter::MediaInfo;

use super::status::Status;

static EPISODE_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)[\s._-]*s(\d{1,2})e(\d{1,3})").ok());

/// Identifier of a media entity, stable for the lifetime of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(Uuid);

impl MediaId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for MediaId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// What kind of title a file holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaKind {
    /// A standalone movie.
    Movie,
    /// One episode of a series.
    Episode {
        series: String,
        season: u32,
        episode: u32,
    },
}

impl MediaKind {
    /// Kind tag used when comparing entities; same spelling as the serde tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Episode { .. } => "episode",
        }
    }

    /// Detects an episode marker such as `S01E02` in a display name.
    pub fn detect(name: &str) -> Self {
        let Some(re) = EPISODE_REGEX.as_ref() else {
            return Self::Movie;
        };
        let Some(caps) = re.captures(name) else {
            return Self::Movie;
        };

        let season = caps.get(2).and_then(|m| m.as_str().parse().ok());
        let episode = caps.get(3).and_then(|m| m.as_str().parse().ok());
        match (season, episode) {
            (Some(season), Some(episode)) => Self::Episode {
                series: caps
                    .get(1)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
                season,
                episode,
            },
            _ => Self::Movie,
        }
    }
}

/// Coarse vertical resolution class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    #[default]
    Unknown,
    /// Below 720 lines.
    Sd,
    /// 720p
    Hd,
    /// 1080p
    FullHd,
    /// 2160p and above
    Uhd,
}

impl Resolution {
    pub fn from_height(height: Option<u32>) -> Self {
        match height {
            None | Some(0) => Self::Unknown,
            Some(h) if h < 720 => Self::Sd,
            Some(h) if h < 1080 => Self::Hd,
            Some(h) if h < 2160 => Self::FullHd,
            Some(_) => Self::Uhd,
        }
    }
}

/// Descriptive metadata from an external lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer_url: Option<String>,
}

/// A text subtitle track extracted next to the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    /// Stream ordinal inside the source file.
    pub index: u32,
    /// Language code or track name.
    pub language: String,
    /// Where the extracted WebVTT file lives.
    pub path: PathBuf,
    /// Whether this track matches the preferred language.
    pub preferred: bool,
}

impl Subtitle {
    /// Whether the extracted file is on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Key used by the slow companion scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimilarityKey {
    pub tag: &'static str,
    pub duration_secs: u64,
    pub name: String,
}

/// Plain, serializable state of one media entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: MediaId,
    /// Absolute file path (the natural key).
    pub path: PathBuf,
    /// Display name.
    pub name: String,
    pub size_bytes: u64,
    pub duration_secs: u64,
    #[serde(default)]
    pub resolution: Resolution,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MediaMetadata>,
    #[serde(default)]
    pub subtitles: Vec<Subtitle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_info: Option<MediaInfo>,
    /// Whether the stream info passed the playback profile.
    pub playable: bool,
    /// Burn subtitles into the video on the next conversion.
    #[serde(default)]
    pub burn_subtitles: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<MediaId>,
}

impl MediaRecord {
    /// Creates a record for `path` with empty technical details.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: MediaId::new(),
            path: path.into(),
            kind: MediaKind::detect(&name),
            name,
            size_bytes: 0,
            duration_secs: 0,
            resolution: Resolution::Unknown,
            metadata: None,
            subtitles: Vec::new(),
            stream_info: None,
            playable: false,
            burn_subtitles: false,
            modified_at: None,
            discovered_at: Utc::now(),
            status: Status::Unplayable,
            companion: None,
        }
    }

    /// True when every expected subtitle file is on disk.
    pub fn subtitles_complete(&self) -> bool {
        self.subtitles.iter().all(Subtitle::exists)
    }

    /// Subtitle tracks whose extracted file is not on disk yet.
    pub fn missing_subtitles(&self) -> Vec<&Subtitle> {
        self.subtitles.iter().filter(|s| !s.exists()).collect()
    }

    /// The track to burn in when extraction is not possible.
    pub fn burn_in_track(&self) -> Option<u32> {
        if !self.burn_subtitles {
            return None;
        }
        self.subtitles
            .iter()
            .find(|s| s.preferred)
            .or_else(|| self.subtitles.first())
            .map(|s| s.index)
    }

    pub fn similarity_key(&self) -> SimilarityKey {
        SimilarityKey {
            tag: self.kind.tag(),
            duration_secs: self.duration_secs,
            name: self.name.to_lowercase(),
        }
    }

    /// Whether `other` should stay visible instead of `self` when both are
    /// duplicates that cannot be played: the newer file wins, then the
    /// lexicographically smaller path.
    pub fn yields_to(&self, other: &MediaRecord) -> bool {
        match (self.modified_at, other.modified_at) {
            (Some(mine), Some(theirs)) if mine != theirs => theirs > mine,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            _ => other.path < self.path,
        }
    }
}
