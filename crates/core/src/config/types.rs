use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::NamingConvention;
use crate::converter::{ConverterConfig, PlaybackProfile};
use crate::stream::StreamConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub playback: PlaybackProfile,
    #[serde(default)]
    pub stream: StreamConfig,
}

/// What to index and how to treat converted files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directories scanned recursively.
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    /// Where the catalog document is saved.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Prefix of converted file names.
    #[serde(default = "default_converted_prefix")]
    pub converted_prefix: String,

    /// Subdirectory receiving converted files; next to the original if unset.
    #[serde(default)]
    pub converted_subdir: Option<String>,

    /// Queue a conversion for every entity that needs one after each scan.
    #[serde(default)]
    pub auto_convert: bool,

    /// Delete the original once its converted rendition is in place.
    #[serde(default)]
    pub supersede_originals: bool,

    /// Subtitle language marked as preferred (e.g. "eng").
    #[serde(default)]
    pub preferred_subtitle_language: Option<String>,

    /// Seconds between background rescans.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("mediashelf-catalog.json")
}

fn default_converted_prefix() -> String {
    "_".to_string()
}

fn default_refresh_interval() -> u64 {
    300
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            catalog_path: default_catalog_path(),
            converted_prefix: default_converted_prefix(),
            converted_subdir: None,
            auto_convert: false,
            supersede_originals: false,
            preferred_subtitle_language: None,
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl LibraryConfig {
    pub fn naming(&self) -> NamingConvention {
        NamingConvention::new(self.converted_prefix.clone(), self.converted_subdir.clone())
    }

    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }
}
