pub mod catalog;
pub mod config;
pub mod converter;
pub mod library;
pub mod media;
pub mod queue;
pub mod store;
pub mod stream;
pub mod testing;

pub use catalog::{CatalogError, CatalogEvent, MediaCatalog, NamingConvention};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LibraryConfig,
};
pub use converter::{Converter, ConverterConfig, ConverterError, FfmpegConverter, PlaybackProfile};
pub use library::{
    LibraryError, LibraryRefresher, LibraryService, MetadataProvider, ScanSummary,
};
pub use media::{derive_status, MediaEntity, MediaId, MediaKind, MediaRecord, Status};
pub use queue::{ConversionJob, ConversionQueue, ConversionTracker, JobError, QueueError};
pub use store::{DualKeyStore, StoreError};
pub use stream::{ProgressiveReader, ProgressiveStreamHandle, StreamConfig, StreamError};
