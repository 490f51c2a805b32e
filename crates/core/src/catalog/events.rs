use serde::Serialize;
use std::path::PathBuf;

use crate::media::{MediaId, Status};

/// Change notification raised by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CatalogEvent {
    Added { id: MediaId, path: PathBuf },
    Removed { id: MediaId, path: PathBuf },
    /// Record details changed (path, metadata, subtitles, stream info).
    Updated { id: MediaId },
    StatusChanged { id: MediaId, status: Status },
    CompanionLinked { id: MediaId, companion: MediaId },
}

impl CatalogEvent {
    pub fn id(&self) -> MediaId {
        match self {
            Self::Added { id, .. }
            | Self::Removed { id, .. }
            | Self::Updated { id }
            | Self::StatusChanged { id, .. }
            | Self::CompanionLinked { id, .. } => *id,
        }
    }
}
