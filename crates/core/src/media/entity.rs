//! The shared, mutable media entity.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use super::status::Status;
use super::types::{MediaId, MediaMetadata, MediaRecord};

/// One discoverable media file.
///
/// Entities are shared as `Arc<MediaEntity>` between the catalog, the
/// conversion hooks and readers. The id never changes; everything else lives
/// in a [`MediaRecord`] behind a lock and is updated in place. Writes are
/// crate-private so they go through the catalog or the library service.
#[derive(Debug)]
pub struct MediaEntity {
    id: MediaId,
    record: RwLock<MediaRecord>,
}

impl MediaEntity {
    pub fn new(record: MediaRecord) -> Self {
        Self {
            id: record.id,
            record: RwLock::new(record),
        }
    }

    pub fn id(&self) -> MediaId {
        self.id
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> MediaRecord {
        self.read(MediaRecord::clone)
    }

    pub fn path(&self) -> PathBuf {
        self.read(|r| r.path.clone())
    }

    pub fn name(&self) -> String {
        self.read(|r| r.name.clone())
    }

    pub fn status(&self) -> Status {
        self.read(|r| r.status)
    }

    pub fn companion(&self) -> Option<MediaId> {
        self.read(|r| r.companion)
    }

    pub fn metadata(&self) -> Option<MediaMetadata> {
        self.read(|r| r.metadata.clone())
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&MediaRecord) -> T) -> T {
        let record = self.record.read().unwrap_or_else(PoisonError::into_inner);
        f(&record)
    }

    /// Mutates the record in place. The id is restored afterwards.
    pub(crate) fn update<T>(&self, f: impl FnOnce(&mut MediaRecord) -> T) -> T {
        let mut record = self.record.write().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut record);
        record.id = self.id;
        out
    }

    /// Returns true when the status actually changed.
    pub(crate) fn set_status(&self, status: Status) -> bool {
        self.update(|r| std::mem::replace(&mut r.status, status) != status)
    }

    pub(crate) fn set_companion(&self, companion: Option<MediaId>) {
        self.update(|r| r.companion = companion);
    }

    pub(crate) fn set_metadata(&self, metadata: Option<MediaMetadata>) {
        self.update(|r| r.metadata = metadata);
    }
}
