//! The library: discovery, conversion orchestration and streaming access.
//!
//! [`LibraryService`] is the single writer for media entities. It wires the
//! catalog, the conversion queue and tracker, and the external engine
//! together, and exposes the entry points a file watcher or an API layer
//! calls. [`LibraryRefresher`] rescans on a timer.

mod error;
mod metadata;
mod refresher;
mod service;

pub use error::LibraryError;
pub use metadata::{MetadataCache, MetadataError, MetadataProvider};
pub use refresher::LibraryRefresher;
pub use service::{LibraryService, ScanSummary};
