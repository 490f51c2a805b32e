//! JSON persistence of the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::CatalogError;
use super::naming::NamingConvention;
use super::registry::MediaCatalog;
use crate::media::{MediaEntity, MediaRecord};

const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CatalogDocument {
    version: u32,
    saved_at: DateTime<Utc>,
    entities: Vec<MediaRecord>,
}

impl MediaCatalog {
    /// Writes every entity to `path` as a JSON document.
    ///
    /// The document is written next to `path` first and renamed into place.
    pub async fn save(&self, path: &Path) -> Result<usize, CatalogError> {
        let mut entities: Vec<MediaRecord> =
            self.entities().iter().map(|e| e.snapshot()).collect();
        entities.sort_by(|a, b| a.path.cmp(&b.path));

        let document = CatalogDocument {
            version: DOCUMENT_VERSION,
            saved_at: Utc::now(),
            entities,
        };
        let json =
            serde_json::to_vec_pretty(&document).map_err(|e| CatalogError::InvalidDocument {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CatalogError::io(parent, e))?;
        }
        let temp = NamingConvention::temp_path(path);
        tokio::fs::write(&temp, &json)
            .await
            .map_err(|e| CatalogError::io(&temp, e))?;
        tokio::fs::rename(&temp, path)
            .await
            .map_err(|e| CatalogError::io(path, e))?;

        info!(
            path = %path.display(),
            count = document.entities.len(),
            "Saved catalog"
        );
        Ok(document.entities.len())
    }

    /// Loads entities saved by [`save`](Self::save).
    ///
    /// Entries whose file no longer exists are dropped, dangling companion
    /// links are cleared, and companions are resolved again for every entity
    /// left unlinked. A missing document loads nothing.
    pub async fn load(&self, path: &Path) -> Result<usize, CatalogError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No saved catalog");
                return Ok(0);
            }
            Err(e) => return Err(CatalogError::io(path, e)),
        };
        let document: CatalogDocument =
            serde_json::from_slice(&bytes).map_err(|e| CatalogError::InvalidDocument {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if document.version != DOCUMENT_VERSION {
            return Err(CatalogError::InvalidDocument {
                path: path.to_path_buf(),
                reason: format!("unsupported version {}", document.version),
            });
        }

        let mut loaded: Vec<Arc<MediaEntity>> = Vec::new();
        let mut dropped = 0usize;
        for record in document.entities {
            if !tokio::fs::try_exists(&record.path).await.unwrap_or(false) {
                dropped += 1;
                continue;
            }
            let entity = Arc::new(MediaEntity::new(record));
            match self
                .store()
                .get_or_add(entity.id(), entity.path(), Arc::clone(&entity))
            {
                Ok((stored, true)) => loaded.push(stored),
                Ok((_, false)) => {}
                Err(e) => {
                    warn!(path = %entity.path().display(), error = %e, "Skipping saved entity");
                }
            }
        }

        // Keep only links whose other side is present and points back.
        for entity in &loaded {
            let Some(companion_id) = entity.companion() else {
                continue;
            };
            let symmetric = self
                .lookup_id(companion_id)
                .is_some_and(|other| other.companion() == Some(entity.id()));
            if !symmetric {
                entity.set_companion(None);
            }
        }

        for entity in &loaded {
            if entity.companion().is_none() {
                self.resolve_companion(entity);
            }
        }

        // Saved transient states (queued, converting) are stale.
        self.refresh_all_with(&|_| None);

        info!(
            path = %path.display(),
            loaded = loaded.len(),
            dropped,
            "Loaded catalog"
        );
        Ok(loaded.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Status;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"video").unwrap();
        path
    }

    fn record(path: &Path, playable: bool) -> MediaRecord {
        let naming = NamingConvention::default();
        let mut record = MediaRecord::new(path, naming.display_name(path));
        record.duration_secs = 100;
        record.playable = playable;
        record
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let original = touch(&dir, "movie.mkv");
        let converted = touch(&dir, "_movie.mkv");
        let doc = dir.path().join("state/catalog.json");

        let catalog = MediaCatalog::default();
        let (a, _) = catalog.insert(record(&original, false));
        let (b, _) = catalog.insert(record(&converted, true));
        assert_eq!(catalog.save(&doc).await.unwrap(), 2);

        let restored = MediaCatalog::default();
        assert_eq!(restored.load(&doc).await.unwrap(), 2);

        let a2 = restored.lookup_id(a.id()).unwrap();
        let b2 = restored.lookup_id(b.id()).unwrap();
        assert_eq!(a2.path(), original);
        assert_eq!(a2.companion(), Some(b.id()));
        assert_eq!(b2.companion(), Some(a.id()));
        assert_eq!(b2.status(), Status::Playable);
        assert_eq!(a2.status(), Status::Hidden);
    }

    #[tokio::test]
    async fn test_load_drops_missing_files_and_relinks() {
        let dir = TempDir::new().unwrap();
        let original = touch(&dir, "movie.mkv");
        let converted = touch(&dir, "_movie.mkv");
        let doc = dir.path().join("catalog.json");

        let catalog = MediaCatalog::default();
        let (a, _) = catalog.insert(record(&original, false));
        let (b, _) = catalog.insert(record(&converted, true));
        catalog.save(&doc).await.unwrap();

        std::fs::remove_file(&converted).unwrap();
        let restored = MediaCatalog::default();
        assert_eq!(restored.load(&doc).await.unwrap(), 1);
        assert!(restored.lookup_id(b.id()).is_none());

        let a2 = restored.lookup_id(a.id()).unwrap();
        assert_eq!(a2.companion(), None);
        assert_eq!(a2.status(), Status::Unplayable);
    }

    #[tokio::test]
    async fn test_load_missing_document() {
        let dir = TempDir::new().unwrap();
        let catalog = MediaCatalog::default();
        assert_eq!(catalog.load(&dir.path().join("nope.json")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("catalog.json");
        std::fs::write(&doc, b"{ not json").unwrap();

        let catalog = MediaCatalog::default();
        let result = catalog.load(&doc).await;
        assert!(matches!(result, Err(CatalogError::InvalidDocument { .. })));
    }
}
