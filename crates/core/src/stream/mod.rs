//! Progressive streaming of files that are still being written.
//!
//! A [`ProgressiveStreamHandle`] pairs the temporary path an encoder appends to
//! with the final path the output is renamed to. Readers created from the
//! handle follow the temporary file while writing is in progress and switch
//! to the final file, at the same offset, once the handle is completed.

mod config;
mod error;
mod handle;
mod reader;

pub use config::StreamConfig;
pub use error::StreamError;
pub use handle::ProgressiveStreamHandle;
pub use reader::ProgressiveReader;
