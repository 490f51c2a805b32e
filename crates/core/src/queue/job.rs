//! A single-use unit of conversion work.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::JobError;

/// One asynchronous step. Receives the job's cancellation token.
pub type JobStep =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<(), JobError>> + Send>;

type Hook = Box<dyn FnOnce() + Send>;
type ErrorHook = Box<dyn FnOnce(&JobError) + Send>;

/// Lifecycle callbacks. Each runs at most once.
#[derive(Default)]
pub struct JobHooks {
    pub(crate) on_add: Option<Hook>,
    pub(crate) on_start: Option<Hook>,
    pub(crate) on_success: Option<Hook>,
    pub(crate) on_error: Option<ErrorHook>,
    pub(crate) on_finally: Option<Hook>,
}

impl JobHooks {
    pub(crate) fn run_add(&mut self) {
        if let Some(hook) = self.on_add.take() {
            hook();
        }
    }

    pub(crate) fn run_start(&mut self) {
        if let Some(hook) = self.on_start.take() {
            hook();
        }
    }

    pub(crate) fn run_success(&mut self) {
        if let Some(hook) = self.on_success.take() {
            hook();
        }
    }

    pub(crate) fn run_error(&mut self, error: &JobError) {
        if let Some(hook) = self.on_error.take() {
            hook(error);
        }
    }

    pub(crate) fn run_finally(&mut self) {
        if let Some(hook) = self.on_finally.take() {
            hook();
        }
    }
}

/// Ordered steps plus hooks, run once by the [`ConversionQueue`](super::ConversionQueue).
pub struct ConversionJob {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) steps: Vec<JobStep>,
    pub(crate) cancel: CancellationToken,
    pub(crate) hooks: JobHooks,
}

impl ConversionJob {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            steps: Vec::new(),
            cancel: CancellationToken::new(),
            hooks: JobHooks::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// A clone of the job's private cancellation token.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Appends a step.
    pub fn with_step<F, Fut>(mut self, step: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.steps.push(Box::new(move |token| step(token).boxed()));
        self
    }

    /// Runs synchronously inside `try_add`.
    pub fn on_add(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.hooks.on_add = Some(Box::new(hook));
        self
    }

    pub fn on_start(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.hooks.on_start = Some(Box::new(hook));
        self
    }

    pub fn on_success(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.hooks.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl FnOnce(&JobError) + Send + 'static) -> Self {
        self.hooks.on_error = Some(Box::new(hook));
        self
    }

    /// Always runs, exactly once, whatever happened to the job.
    pub fn on_finally(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.hooks.on_finally = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for ConversionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionJob")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("steps", &self.steps.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_builder_collects_steps() {
        let job = ConversionJob::new("convert movie.mkv")
            .with_step(|_| async { Ok(()) })
            .with_step(|_| async { Err(JobError::failed("boom")) });

        assert_eq!(job.description(), "convert movie.mkv");
        assert_eq!(job.step_count(), 2);
        assert!(!job.id().is_empty());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let job = ConversionJob::new("job");
        let token = job.cancel_token();
        job.cancel();
        assert!(token.is_cancelled());
        assert!(job.is_cancelled());
    }

    #[test]
    fn test_hooks_run_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let mut job = ConversionJob::new("job").on_finally(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        job.hooks.run_finally();
        job.hooks.run_finally();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_engine_cancellation_counts_as_cancelled() {
        use crate::converter::ConverterError;

        assert!(JobError::Cancelled.is_cancelled());
        assert!(JobError::Engine(ConverterError::Cancelled).is_cancelled());
        assert!(!JobError::failed("x").is_cancelled());
    }
}
