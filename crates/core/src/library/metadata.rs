//! Descriptive metadata lookup and its cache.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

use crate::media::{MediaKind, MediaMetadata};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata lookup failed: {0}")]
    LookupFailed(String),
}

/// External source of titles, posters and trailers.
///
/// Lookups are opportunistic: failures are logged by the caller and never
/// affect scanning or conversion.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Looks up `title`. `Ok(None)` means nothing matched.
    async fn lookup(
        &self,
        title: &str,
        kind: &MediaKind,
    ) -> Result<Option<MediaMetadata>, MetadataError>;
}

/// Lookup results keyed by file path.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<PathBuf, MediaMetadata>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<MediaMetadata> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn insert(&self, path: PathBuf, metadata: MediaMetadata) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, metadata);
    }

    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
