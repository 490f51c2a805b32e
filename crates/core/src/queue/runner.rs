//! Single-worker conversion queue.
//!
//! Jobs run strictly one after another in submission order:
//! - `try_add` runs on-add synchronously and enqueues
//! - the worker runs on-start, then each step, checking cancellation first
//! - on-success or on-error, then on-finally exactly once

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::JobError;
use super::job::ConversionJob;

/// The process-wide conversion queue.
pub struct ConversionQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<ConversionJob>>>,
    shutdown: CancellationToken,
    current: Arc<Mutex<Option<CancellationToken>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ConversionQueue {
    /// Creates the queue and spawns its worker on the current runtime.
    pub fn start() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let current = Arc::new(Mutex::new(None));

        let worker = tokio::spawn(run_worker(rx, shutdown.clone(), Arc::clone(&current)));

        Self {
            sender: Mutex::new(Some(tx)),
            shutdown,
            current,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueues `job`. Returns false only when the queue has been shut down.
    pub fn try_add(&self, mut job: ConversionJob) -> bool {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            debug!("Rejecting job {}: queue shut down", job.description);
            return false;
        };

        job.hooks.run_add();
        debug!("Queued job {} ({})", job.id, job.description);

        if let Err(mpsc::error::SendError(mut job)) = tx.send(job) {
            warn!("Conversion worker is gone, dropping job {}", job.description);
            job.cancel.cancel();
            job.hooks.run_finally();
            return false;
        }
        true
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops accepting jobs, cancels the running job, drains pending jobs
    /// without running their steps, and waits for the worker to exit.
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() && self.shutdown.is_cancelled() {
            return;
        }
        drop(sender);

        info!("Stopping conversion queue");
        self.shutdown.cancel();
        if let Some(token) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            token.cancel();
        }

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Conversion worker ended abnormally: {}", e);
            }
        }
        info!("Conversion queue stopped");
    }
}

impl Drop for ConversionQueue {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(token) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            token.cancel();
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<ConversionJob>,
    shutdown: CancellationToken,
    current: Arc<Mutex<Option<CancellationToken>>>,
) {
    info!("Conversion worker started");
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Conversion worker received shutdown signal");
                break;
            }
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        run_job(job, &shutdown, &current).await;
    }

    rx.close();
    let mut drained = 0usize;
    while let Ok(job) = rx.try_recv() {
        drain_job(job);
        drained += 1;
    }
    if drained > 0 {
        info!("Drained {} pending conversion jobs", drained);
    }
    info!("Conversion worker stopped");
}

fn set_current(current: &Mutex<Option<CancellationToken>>, token: Option<CancellationToken>) {
    *current.lock().unwrap_or_else(PoisonError::into_inner) = token;
}

async fn run_job(
    job: ConversionJob,
    shutdown: &CancellationToken,
    current: &Mutex<Option<CancellationToken>>,
) {
    let ConversionJob {
        id,
        description,
        steps,
        cancel,
        mut hooks,
    } = job;

    // Published before the shutdown check; `shutdown()` cancels before reading `current`.
    set_current(current, Some(cancel.clone()));
    if shutdown.is_cancelled() {
        cancel.cancel();
    }
    if cancel.is_cancelled() {
        debug!("Skipping cancelled job {} ({})", id, description);
        set_current(current, None);
        hooks.run_finally();
        return;
    }

    info!("Starting job {} ({})", id, description);
    hooks.run_start();

    let mut outcome = Ok(());
    for step in steps {
        if cancel.is_cancelled() {
            outcome = Err(JobError::Cancelled);
            break;
        }
        if let Err(e) = step(cancel.clone()).await {
            outcome = Err(e);
            break;
        }
    }

    match outcome {
        Ok(()) => {
            info!("Job {} ({}) finished", id, description);
            hooks.run_success();
        }
        Err(e) => {
            if e.is_cancelled() {
                info!("Job {} ({}) cancelled", id, description);
            } else {
                warn!("Job {} ({}) failed: {}", id, description, e);
            }
            hooks.run_error(&e);
        }
    }

    set_current(current, None);
    hooks.run_finally();
}

fn drain_job(job: ConversionJob) {
    let ConversionJob {
        cancel, mut hooks, ..
    } = job;
    cancel.cancel();
    hooks.run_finally();
}
