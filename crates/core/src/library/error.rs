//! Error types for the library service.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::media::{MediaId, Status};
use crate::queue::QueueError;
use crate::stream::StreamError;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Unknown media: {id}")]
    UnknownMedia { id: MediaId },

    #[error("Nothing to convert for {id} (status {status})")]
    NothingToConvert { id: MediaId, status: Status },

    #[error("Media {id} cannot be streamed (status {status})")]
    NotStreamable { id: MediaId, status: Status },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}
