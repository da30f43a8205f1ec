//! # Parallel Task Runner
//!
//! Fork-join execution of a fixed batch of independent units of work on a
//! bounded `rayon` pool. Used wherever the pipeline has independent steps:
//! tool probes, cloning and synchronizing the managed repositories, and the
//! legacy nested clones.
//!
//! Every task in a batch runs to completion; a failing task never cancels
//! its siblings. Once the whole batch has finished, outcomes are reconciled
//! by [`aggregate`]:
//!
//! - any failure wins over any status, and the first failure in submission
//!   order is the one reported;
//! - otherwise the last non-zero status in submission order is returned;
//! - otherwise `0`.
//!
//! A batch that has not finished when the runner's ceiling elapses is an
//! internal fault ([`Error::TaskTimeout`]), since tasks are expected to be
//! short-lived.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};

/// A unit of work: returns a status code or raises a failure.
pub type Task = Box<dyn FnOnce() -> Result<i32> + Send + 'static>;

/// Wall-clock ceiling for a single batch.
pub const DEFAULT_CEILING: Duration = Duration::from_secs(60 * 60);

/// Box a closure as a [`Task`].
pub fn task<F>(work: F) -> Task
where
    F: FnOnce() -> Result<i32> + Send + 'static,
{
    Box::new(work)
}

/// `max(2, available parallelism)`.
pub fn default_concurrency() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(2)
}

/// Runs batches of tasks across a bounded worker pool.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    concurrency: usize,
    ceiling: Duration,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::with_concurrency(default_concurrency())
    }

    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            ceiling: DEFAULT_CEILING,
        }
    }

    /// Single worker: tasks run one after another in submission order.
    pub fn sequential() -> Self {
        Self::with_concurrency(1)
    }

    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every task and block until all of them finish.
    pub fn run(&self, tasks: Vec<Task>) -> Result<i32> {
        let count = tasks.len();
        if count == 0 {
            return Ok(0);
        }

        let threads = self.concurrency.min(count);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("buildtools-worker-{}", index))
            .build()
            .map_err(|e| Error::Environment {
                tool: "thread pool".to_string(),
                message: e.to_string(),
                hint: None,
            })?;

        debug!("Running {} tasks on {} workers", count, threads);

        let (sender, receiver) = mpsc::channel();
        for (index, work) in tasks.into_iter().enumerate() {
            let sender = sender.clone();
            pool.spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
                    Err(Error::TaskPanicked {
                        message: panic_message(payload.as_ref()),
                    })
                });
                // The receiver only disappears after a timeout, at which
                // point nobody is waiting for this outcome.
                sender.send((index, outcome)).ok();
            });
        }
        drop(sender);

        let started = Instant::now();
        let deadline = started + self.ceiling;
        let mut outcomes: Vec<Option<Result<i32>>> = (0..count).map(|_| None).collect();
        for _ in 0..count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining) {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(Error::TaskTimeout {
                        elapsed_secs: started.elapsed().as_secs(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        aggregate(outcomes.into_iter().map(|outcome| {
            outcome.unwrap_or_else(|| {
                Err(Error::TaskPanicked {
                    message: "worker exited without reporting".to_string(),
                })
            })
        }))
    }
}

/// Reconcile the outcomes of one batch, given in submission order.
pub fn aggregate<I>(outcomes: I) -> Result<i32>
where
    I: IntoIterator<Item = Result<i32>>,
{
    let mut status = 0;
    let mut failure = None;
    for outcome in outcomes {
        match outcome {
            Ok(0) => {}
            Ok(code) => status = code,
            Err(e) => {
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(status),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
