//! File naming convention linking originals to converted renditions.
//!
//! A converted file carries a prefix in front of the original file name and
//! sits either next to the original or in a configured subdirectory:
//!
//! ```text
//! /movies/movie.avi            original
//! /movies/_movie.mkv           converted, same directory
//! /movies/converted/_movie.mkv converted, demoted directory
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension of an output while the encoder is still writing it.
pub const TEMP_EXTENSION: &str = "partial";

/// Containers a converted rendition may use.
const CONVERTED_EXTENSIONS: [&str; 3] = ["mkv", "mp4", "webm"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConvention {
    /// Prefix marking a converted file.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Directory (relative to the original's) receiving converted files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
}

fn default_prefix() -> String {
    "_".to_string()
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            subdir: None,
        }
    }
}

impl NamingConvention {
    pub fn new(prefix: impl Into<String>, subdir: Option<String>) -> Self {
        Self {
            prefix: prefix.into(),
            subdir,
        }
    }

    fn file_name(path: &Path) -> Option<String> {
        path.file_name().map(|n| n.to_string_lossy().to_string())
    }

    /// Whether `path` names a converted rendition.
    pub fn is_converted(&self, path: &Path) -> bool {
        !self.prefix.is_empty()
            && Self::file_name(path).is_some_and(|name| name.starts_with(&self.prefix))
    }

    /// Where the converted rendition of `original` may live.
    pub fn converted_candidates(&self, original: &Path) -> Vec<PathBuf> {
        let (Some(dir), Some(name)) = (original.parent(), Self::file_name(original)) else {
            return Vec::new();
        };
        let stem = file_stem(&name);

        let mut names = vec![format!("{}{}", self.prefix, name)];
        for ext in CONVERTED_EXTENSIONS {
            let candidate = format!("{}{}.{}", self.prefix, stem, ext);
            if !names.contains(&candidate) {
                names.push(candidate);
            }
        }

        let mut dirs = vec![dir.to_path_buf()];
        if let Some(subdir) = &self.subdir {
            dirs.push(dir.join(subdir));
        }

        dirs.iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .collect()
    }

    /// Where the original of `converted` may live: same directory, then one up.
    pub fn original_candidates(&self, converted: &Path) -> Vec<PathBuf> {
        let (Some(dir), Some(name)) = (converted.parent(), Self::file_name(converted)) else {
            return Vec::new();
        };
        let Some(original_name) = name.strip_prefix(&self.prefix) else {
            return Vec::new();
        };
        if original_name.is_empty() {
            return Vec::new();
        }

        let mut candidates = vec![dir.join(original_name)];
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join(original_name));
        }
        candidates
    }

    /// Whether `candidate` may be the original `converted` was made from.
    ///
    /// Conversion changes the container, so only the stem has to match the
    /// prefix-stripped name, in a directory [`original_candidates`] searches.
    ///
    /// [`original_candidates`]: Self::original_candidates
    pub fn is_original_of(&self, converted: &Path, candidate: &Path) -> bool {
        if self.is_converted(candidate) || Self::is_temp(candidate) {
            return false;
        }
        let stem = |path: &Path| Self::file_name(path).map(|name| file_stem(&name).to_string());
        let wanted = stem(candidate);
        wanted.is_some()
            && self
                .original_candidates(converted)
                .iter()
                .any(|path| path.parent() == candidate.parent() && stem(path) == wanted)
    }

    /// Candidate companion paths for either side of a pair.
    pub fn companion_candidates(&self, path: &Path) -> Vec<PathBuf> {
        if self.is_converted(path) {
            self.original_candidates(path)
        } else {
            self.converted_candidates(path)
        }
    }

    /// Final path of the converted rendition of `original`.
    pub fn converted_output(&self, original: &Path, extension: &str) -> PathBuf {
        let dir = original.parent().unwrap_or_else(|| Path::new(""));
        let dir = match &self.subdir {
            Some(subdir) => dir.join(subdir),
            None => dir.to_path_buf(),
        };
        let stem = Self::file_name(original)
            .map(|name| file_stem(&name).to_string())
            .unwrap_or_default();
        dir.join(format!("{}{}.{}", self.prefix, stem, extension))
    }

    /// Path the encoder writes to before the output is renamed into place.
    pub fn temp_path(final_path: &Path) -> PathBuf {
        let mut name = final_path.as_os_str().to_os_string();
        name.push(".");
        name.push(TEMP_EXTENSION);
        PathBuf::from(name)
    }

    pub fn is_temp(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == TEMP_EXTENSION)
    }

    /// Human-readable name: prefix and extension removed, separators as spaces.
    pub fn display_name(&self, path: &Path) -> String {
        let name = Self::file_name(path).unwrap_or_default();
        let name = if self.prefix.is_empty() {
            name.as_str()
        } else {
            name.strip_prefix(&self.prefix).unwrap_or(&name)
        };
        file_stem(name)
            .replace(['.', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Where subtitle track `index` of `video` is extracted to.
    pub fn subtitle_path(video: &Path, index: u32, language: &str) -> PathBuf {
        let dir = video.parent().unwrap_or_else(|| Path::new(""));
        let stem = Self::file_name(video)
            .map(|name| file_stem(&name).to_string())
            .unwrap_or_default();
        dir.join(format!("{}.{}.{}.vtt", stem, index, language))
    }
}

fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}
