//! Bounded-concurrency worker pool.
//!
//! A fixed number of long-lived tokio tasks pull jobs from one shared,
//! bounded queue. Each job's outcome lands on either the results or the
//! errors channel; a failing job never stops the pool.
//!
//! Lifecycle: [`new`](WorkerPool::new) → [`take_results`](WorkerPool::take_results)
//! / [`take_errors`](WorkerPool::take_errors) → [`start`](WorkerPool::start) →
//! [`submit`](WorkerPool::submit)… → [`close`](WorkerPool::close). Both
//! receivers must be drained while jobs are running, otherwise workers block
//! on full output channels until the cancellation token fires.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use loglens_core::{resolve_buffer_size, resolve_workers};

/// Errors returned by [`WorkerPool::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The cancellation token fired before the job was accepted.
    #[error("Operation cancelled")]
    Cancelled,

    /// The pool no longer accepts jobs.
    #[error("Worker pool is closed")]
    Closed,
}

/// Runs a processor over submitted jobs with at most `workers` in flight.
pub struct WorkerPool<J, R, E> {
    workers: usize,
    buffer_size: usize,
    started: bool,
    job_tx: Option<mpsc::Sender<J>>,
    job_rx: Arc<Mutex<mpsc::Receiver<J>>>,
    result_tx: Option<mpsc::Sender<R>>,
    result_rx: Option<mpsc::Receiver<R>>,
    error_tx: Option<mpsc::Sender<E>>,
    error_rx: Option<mpsc::Receiver<E>>,
    handles: Vec<JoinHandle<()>>,
}

impl<J, R, E> WorkerPool<J, R, E>
where
    J: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    /// Create a pool.
    ///
    /// `workers == 0` uses the host's available parallelism and
    /// `buffer_size == 0` sizes every channel at twice the worker count.
    pub fn new(workers: usize, buffer_size: usize) -> Self {
        let workers = resolve_workers(workers);
        let buffer_size = resolve_buffer_size(buffer_size, workers);

        let (job_tx, job_rx) = mpsc::channel(buffer_size);
        let (result_tx, result_rx) = mpsc::channel(buffer_size);
        let (error_tx, error_rx) = mpsc::channel(buffer_size);

        Self {
            workers,
            buffer_size,
            started: false,
            job_tx: Some(job_tx),
            job_rx: Arc::new(Mutex::new(job_rx)),
            result_tx: Some(result_tx),
            result_rx: Some(result_rx),
            error_tx: Some(error_tx),
            error_rx: Some(error_rx),
            handles: Vec::new(),
        }
    }

    /// Number of worker tasks.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Capacity of the job, result and error channels.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Take the receiver for successful results. Returns `None` after the
    /// first call.
    pub fn take_results(&mut self) -> Option<mpsc::Receiver<R>> {
        self.result_rx.take()
    }

    /// Take the receiver for job failures. Returns `None` after the first call.
    pub fn take_errors(&mut self) -> Option<mpsc::Receiver<E>> {
        self.error_rx.take()
    }

    /// Spawn the workers. Calling this again, or after [`close`](Self::close),
    /// does nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&mut self, cancel: CancellationToken, processor: F)
    where
        F: Fn(CancellationToken, J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        if self.started {
            return;
        }
        let (Some(results), Some(errors)) = (self.result_tx.clone(), self.error_tx.clone()) else {
            return;
        };
        self.started = true;

        let processor = Arc::new(processor);
        for id in 0..self.workers {
            self.handles.push(tokio::spawn(worker_loop(
                id,
                self.job_rx.clone(),
                results.clone(),
                errors.clone(),
                processor.clone(),
                cancel.clone(),
            )));
        }
        tracing::debug!(workers = self.workers, buffer = self.buffer_size, "worker pool started");
    }

    /// Enqueue a job, waiting for queue capacity.
    ///
    /// Fails with [`PoolError::Cancelled`] if `cancel` fires first; a job is
    /// never dropped silently.
    pub async fn submit(&self, cancel: &CancellationToken, job: J) -> Result<(), PoolError> {
        let tx = self.job_tx.as_ref().ok_or(PoolError::Closed)?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PoolError::Cancelled),
            sent = tx.send(job) => sent.map_err(|_| PoolError::Closed),
        }
    }

    /// Stop accepting jobs, wait for in-flight jobs to finish, then close the
    /// result and error channels.
    pub async fn close(&mut self) {
        self.job_tx.take();

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker task ended abnormally");
            }
        }

        self.result_tx.take();
        self.error_tx.take();
        tracing::debug!("worker pool closed");
    }
}

async fn worker_loop<J, R, E, F, Fut>(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<J>>>,
    results: mpsc::Sender<R>,
    errors: mpsc::Sender<E>,
    processor: Arc<F>,
    cancel: CancellationToken,
) where
    F: Fn(CancellationToken, J) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    loop {
        let job = {
            let mut rx = jobs.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };

        let delivered = match (*processor)(cancel.clone(), job).await {
            Ok(result) => deliver(&results, result, &cancel).await,
            Err(error) => deliver(&errors, error, &cancel).await,
        };
        if !delivered {
            break;
        }
    }
    tracing::trace!(worker = id, "worker stopped");
}

/// Send an outcome, giving up if the token fires while the channel is full.
///
/// An outcome that fits without waiting is always delivered, so work
/// finished just before cancellation is not lost.
async fn deliver<T>(tx: &mpsc::Sender<T>, value: T, cancel: &CancellationToken) -> bool {
    let value = match tx.try_send(value) {
        Ok(()) => return true,
        Err(mpsc::error::TrySendError::Closed(_)) => return false,
        Err(mpsc::error::TrySendError::Full(value)) => value,
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(value) => sent.is_ok(),
    }
}
