//! This module contains a single worker's run loop and the shared cancellation signal
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use serde_derive::{Deserialize, Serialize};

use crate::memory::{Allocation, BestFitMemoryAllocator};
use crate::process::Process;

/// Shared flag that cuts heartbeat sleeps short once the pool is force-stopped.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Sleeps for `duration`. Returns false if cancelled before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.cancelled.lock();
        while !*cancelled {
            if self
                .condvar
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                return !*cancelled;
            }
        }
        false
    }
}

///three ways a submitted process can leave a worker
///ran to termination, stopped mid-run by cancellation, never started because the pool was cancelled first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Completed,
    Interrupted,
    Skipped,
}

pub struct Job {
    pub process: Process,
    pub allocation: Allocation,
    /// Set when memory is handed back on termination.
    pub release_to: Option<Arc<BestFitMemoryAllocator>>,
}

#[derive(Debug)]
pub struct FinishedJob {
    pub worker_id: usize,
    pub process: Process,
    pub allocation: Allocation,
    pub outcome: ExecutionOutcome,
}

pub(crate) fn run_worker(
    worker_id: usize,
    jobs: flume::Receiver<Job>,
    finished: flume::Sender<FinishedJob>,
    tick: Duration,
    cancel: Arc<CancellationToken>,
) {
    while let Ok(job) = jobs.recv() {
        let Job {
            mut process,
            allocation,
            release_to,
        } = job;

        let outcome = if cancel.is_cancelled() {
            ExecutionOutcome::Skipped
        } else {
            debug!("Worker {} dispatched process {}", worker_id, process.id());
            match process.execute(tick, &cancel) {
                Ok(()) => {
                    if let Some(allocator) = release_to {
                        allocator.release(allocation);
                    }
                    ExecutionOutcome::Completed
                }
                Err(err) => {
                    warn!("Worker {}: {}", worker_id, err);
                    ExecutionOutcome::Interrupted
                }
            }
        };

        let finished_job = FinishedJob {
            worker_id,
            process,
            allocation,
            outcome,
        };
        if finished.send(finished_job).is_err() {
            break;
        }
    }
    debug!("Worker {} exiting", worker_id);
}
