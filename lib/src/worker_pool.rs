use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};
use serde_derive::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::worker::{run_worker, CancellationToken, FinishedJob, Job};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrainResult {
    Drained,
    TimedOut,
}

#[derive(Debug)]
pub struct DrainReport {
    pub result: DrainResult,
    /// Every submitted process, in the order workers handed them back.
    pub finished: Vec<FinishedJob>,
}

/// Fixed set of worker threads pulling jobs from one FIFO queue.
pub struct WorkerPool {
    job_sender: Option<flume::Sender<Job>>,
    finished_receiver: flume::Receiver<FinishedJob>,
    workers: Vec<JoinHandle<()>>,
    cancel: Arc<CancellationToken>,
    submitted: usize,
}

impl WorkerPool {
    pub fn new(number_of_workers: usize, tick: Duration) -> SimResult<Self> {
        let (job_sender, job_receiver) = flume::unbounded();
        let (finished_sender, finished_receiver) = flume::unbounded();
        let cancel = Arc::new(CancellationToken::new());

        let workers = (0..number_of_workers)
            .map(|worker_id| {
                let jobs = job_receiver.clone();
                let finished = finished_sender.clone();
                let cancel = Arc::clone(&cancel);
                thread::Builder::new()
                    .name(format!("worker-{}", worker_id))
                    .spawn(move || run_worker(worker_id, jobs, finished, tick, cancel))
                    .map_err(SimError::WorkerSpawn)
            })
            .collect::<SimResult<Vec<JoinHandle<()>>>>()?;

        Ok(Self {
            job_sender: Some(job_sender),
            finished_receiver,
            workers,
            cancel,
            submitted: 0,
        })
    }

    pub fn number_of_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.job_sender.is_none()
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Queues a job; it starts as soon as a worker is free.
    pub fn submit(&mut self, job: Job) -> SimResult<()> {
        let sender = self.job_sender.as_ref().ok_or(SimError::PoolClosed)?;
        sender.send(job).map_err(|_| SimError::PoolClosed)?;
        self.submitted += 1;
        Ok(())
    }

    /// Stops accepting jobs and waits up to `timeout` for every submitted job.
    ///
    /// On timeout the pool is cancelled: running processes stop at their next
    /// heartbeat and queued ones are handed back unstarted.
    pub fn shutdown_and_wait(&mut self, timeout: Duration) -> DrainReport {
        self.job_sender.take();
        let deadline = Instant::now() + timeout;
        let mut finished = Vec::with_capacity(self.submitted);
        let mut result = DrainResult::Drained;

        while finished.len() < self.submitted {
            match self.finished_receiver.recv_deadline(deadline) {
                Ok(finished_job) => finished.push(finished_job),
                Err(flume::RecvTimeoutError::Timeout) => {
                    let err = SimError::PoolDrainTimeout {
                        timeout,
                        pending: self.submitted - finished.len(),
                    };
                    warn!("{}", err);
                    result = DrainResult::TimedOut;
                    self.cancel.cancel();
                    break;
                }
                Err(flume::RecvTimeoutError::Disconnected) => break,
            }
        }

        // After cancellation workers only finish their current heartbeat.
        while finished.len() < self.submitted {
            match self.finished_receiver.recv() {
                Ok(finished_job) => finished.push(finished_job),
                Err(_) => break,
            }
        }
        self.join_workers();
        self.submitted = 0;

        info!(
            "Worker pool shut down ({:?}, {} processes returned)",
            result,
            finished.len()
        );
        DrainReport { result, finished }
    }

    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("A worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.cancel.cancel();
        self.job_sender.take();
        self.join_workers();
    }
}
