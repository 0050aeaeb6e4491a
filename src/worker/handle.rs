//! Background worker threads with job-id correlation.
//!
//! A handle owns one request channel shared by the worker's threads and one
//! response channel back to the caller. Every submission gets a fresh job id;
//! only the response carrying the most recently issued id is ever delivered.
//! Earlier responses, whenever they arrive, are dropped.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Identifier attached to a request and echoed on its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stateless unit of background work.
pub trait Worker: Send + Sync + 'static {
    type Request: Send + 'static;
    type Response: Send + 'static;

    /// Name used in thread names and log fields.
    const NAME: &'static str;

    fn process(&self, request: &Self::Request) -> Self::Response;

    /// Best-effort response when `process` panics.
    fn recover(&self, request: &Self::Request) -> Self::Response;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("{worker} worker is not running")]
    Disconnected { worker: &'static str },

    #[error("failed to spawn {worker} worker thread: {message}")]
    Spawn {
        worker: &'static str,
        message: String,
    },
}

type Job<Req> = (JobId, Req);

pub struct WorkerHandle<W: Worker> {
    requests: Option<Sender<Job<W::Request>>>,
    responses: Receiver<Job<W::Response>>,
    latest: AtomicU64,
    threads: Vec<JoinHandle<()>>,
}

impl<W: Worker> WorkerHandle<W> {
    /// Start `threads` threads (at least one) running `worker`.
    pub fn spawn(worker: W, threads: usize) -> Result<Self, WorkerError> {
        let (request_tx, request_rx) = unbounded::<Job<W::Request>>();
        let (response_tx, response_rx) = unbounded::<Job<W::Response>>();
        let worker = Arc::new(worker);

        let mut handles = Vec::new();
        for index in 0..threads.max(1) {
            let worker = Arc::clone(&worker);
            let requests = request_rx.clone();
            let responses = response_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{index}", W::NAME))
                .spawn(move || run(&*worker, &requests, &responses))
                .map_err(|e| WorkerError::Spawn {
                    worker: W::NAME,
                    message: e.to_string(),
                })?;
            handles.push(handle);
        }

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            latest: AtomicU64::new(0),
            threads: handles,
        })
    }

    /// Queue a request. It supersedes every request submitted before it.
    pub fn submit(&self, request: W::Request) -> Result<JobId, WorkerError> {
        let id = JobId(self.latest.fetch_add(1, Ordering::SeqCst) + 1);
        self.requests
            .as_ref()
            .ok_or(WorkerError::Disconnected { worker: W::NAME })?
            .send((id, request))
            .map_err(|_| WorkerError::Disconnected { worker: W::NAME })?;
        debug!(worker = W::NAME, job = %id, "request submitted");
        Ok(id)
    }

    /// Most recently issued job id, if any.
    pub fn latest(&self) -> Option<JobId> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            id => Some(JobId(id)),
        }
    }

    /// Wait for the response to the latest submission.
    ///
    /// Stale responses are discarded while waiting. Returns `None` when the
    /// timeout elapses or the worker has gone away.
    pub fn recv_latest(&self, timeout: Duration) -> Option<W::Response> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.responses.recv_timeout(remaining) {
                Ok((id, response)) => {
                    if Some(id) == self.latest() {
                        return Some(response);
                    }
                    debug!(worker = W::NAME, job = %id, "discarding stale response");
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        worker = W::NAME,
                        timeout_ms = timeout.as_millis() as u64,
                        "worker response timed out"
                    );
                    return None;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(worker = W::NAME, "worker disconnected");
                    return None;
                }
            }
        }
    }
}

fn run<W: Worker>(
    worker: &W,
    requests: &Receiver<Job<W::Request>>,
    responses: &Sender<Job<W::Response>>,
) {
    for (id, request) in requests.iter() {
        let response = match catch_unwind(AssertUnwindSafe(|| worker.process(&request))) {
            Ok(response) => response,
            Err(_) => {
                error!(worker = W::NAME, job = %id, "worker panicked, sending fallback response");
                worker.recover(&request)
            }
        };
        if responses.send((id, response)).is_err() {
            break;
        }
    }
}

impl<W: Worker> Drop for WorkerHandle<W> {
    fn drop(&mut self) {
        // Closing the request channel ends every thread's receive loop.
        self.requests.take();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!(worker = W::NAME, "worker thread exited abnormally");
            }
        }
    }
}
