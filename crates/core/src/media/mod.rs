//! Media entities and their lifecycle status.
//!
//! A [`MediaEntity`] is the live, shared record for one video file. Its
//! status is never set directly by callers: it is re-derived through
//! [`derive_status`] whenever one of its inputs changes (probe result,
//! subtitle files on disk, companion status, conversion progress).

mod entity;
mod status;
mod types;

pub use entity::MediaEntity;
pub use status::{derive_status, CompanionState, JobPhase, Status, StatusInputs, StatusOutcome};
pub use types::{
    MediaId, MediaKind, MediaMetadata, MediaRecord, Resolution, SimilarityKey, Subtitle,
};
