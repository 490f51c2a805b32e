//! Conversion jobs and the single worker that runs them.
//!
//! The queue only serializes work; the [`ConversionTracker`] is what keeps a
//! media entity from having two jobs outstanding.

mod error;
mod job;
mod runner;
mod tracker;

pub use error::{JobError, QueueError};
pub use job::{ConversionJob, JobHooks, JobStep};
pub use runner::ConversionQueue;
pub use tracker::{ConversionTracker, TrackedConversion};
