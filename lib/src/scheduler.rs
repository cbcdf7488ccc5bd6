//! Admission by memory and dispatch onto the worker pool.
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde_derive::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::memory::{Allocation, BestFitMemoryAllocator};
use crate::process::Process;
use crate::process_id::ProcessId;
use crate::worker::Job;
use crate::worker_pool::{DrainReport, WorkerPool};

pub trait SchedulingAlgorithm {
    fn add_process(&mut self, process: Process, allocator: &Arc<BestFitMemoryAllocator>) -> bool;
    fn execute_processes(&mut self) -> DrainReport;
}

/// Admission record kept in the ready queue. The process itself moves to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedProcess {
    pub id: ProcessId,
    pub priority: i32,
    pub arrival_time: u32,
    pub burst_time: u32,
    pub memory: u32,
    pub allocation: Allocation,
}

/// Admits processes by memory and runs each one to completion on a fixed
/// pool of workers.
///
/// # Description
///
/// There is no time slicing: a dispatched process keeps its worker until it
/// terminates, so up to `number_of_workers` processes run at once and the rest
/// wait in the pool's FIFO queue. Only memory gates admission. Priority and
/// arrival time are carried along but never consulted for ordering.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lib::config::SimulationConfig;
/// use lib::memory::BestFitMemoryAllocator;
/// use lib::observer::{NullObserver, SimulationObserver};
/// use lib::process::{Process, ProcessSpec};
/// use lib::process_id::ProcessIdRegistry;
/// use lib::scheduler::{ConcurrentWorkerPoolScheduler, SchedulingAlgorithm};
///
/// let config = SimulationConfig { tick_millis: 1, ..Default::default() };
/// let observer: Arc<dyn SimulationObserver> = Arc::new(NullObserver);
/// let allocator = Arc::new(BestFitMemoryAllocator::with_default_blocks(observer.clone()));
/// let registry = ProcessIdRegistry::default();
/// let mut scheduler = ConcurrentWorkerPoolScheduler::new(&config).unwrap();
///
/// let process = Process::new(&registry, ProcessSpec::new(2, 0, 3, 300), observer).unwrap();
/// assert!(scheduler.add_process(process, &allocator));
/// let report = scheduler.execute_processes();
/// assert_eq!(report.finished.len(), 1);
/// ```
pub struct ConcurrentWorkerPoolScheduler {
    ready_queue: VecDeque<QueuedProcess>,
    pool: WorkerPool,
    drain_timeout: Duration,
    reclaim_memory: bool,
}

impl ConcurrentWorkerPoolScheduler {
    pub fn new(config: &SimulationConfig) -> SimResult<Self> {
        Ok(Self {
            ready_queue: VecDeque::new(),
            pool: WorkerPool::new(config.number_of_workers, config.tick())?,
            drain_timeout: config.drain_timeout(),
            reclaim_memory: config.reclaim_memory,
        })
    }

    pub fn ready_queue(&self) -> &VecDeque<QueuedProcess> {
        &self.ready_queue
    }

    pub fn is_ready_queue_empty(&self) -> bool {
        self.ready_queue.is_empty()
    }

    pub fn number_of_workers(&self) -> usize {
        self.pool.number_of_workers()
    }
}

impl SchedulingAlgorithm for ConcurrentWorkerPoolScheduler {
    fn add_process(&mut self, process: Process, allocator: &Arc<BestFitMemoryAllocator>) -> bool {
        let pid = process.id();
        if self.pool.is_closed() {
            warn!(
                "Process ID: {} not added because the scheduler is shut down.",
                pid
            );
            return false;
        }

        let allocation = match allocator.try_allocate(process.memory()) {
            Ok(allocation) => allocation,
            Err(err) => {
                warn!(
                    "Process ID: {} not added due to insufficient memory. ({})",
                    pid, err
                );
                return false;
            }
        };

        let queued_process = QueuedProcess {
            id: pid,
            priority: process.priority(),
            arrival_time: process.arrival_time(),
            burst_time: process.burst_time(),
            memory: process.memory(),
            allocation,
        };
        let job = Job {
            process,
            allocation,
            release_to: self.reclaim_memory.then(|| Arc::clone(allocator)),
        };
        if let Err(err) = self.pool.submit(job) {
            warn!("Process ID: {} not added: {}", pid, err);
            allocator.release(allocation);
            return false;
        }

        self.ready_queue.push_back(queued_process);
        info!("Process ID: {} added to the queue.", pid);
        true
    }

    fn execute_processes(&mut self) -> DrainReport {
        self.pool.shutdown_and_wait(self.drain_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DEFAULT_MEMORY_BLOCKS;
    use crate::observer::{ChannelObserver, NullObserver, SimulationEvent, SimulationObserver};
    use crate::process::{ProcessSpec, ProcessState};
    use crate::process_id::ProcessIdRegistry;
    use crate::worker::ExecutionOutcome;
    use crate::worker_pool::DrainResult;
    use std::collections::HashSet;

    fn create_config(number_of_workers: usize, tick_millis: u64) -> SimulationConfig {
        let _ = env_logger::builder().is_test(true).try_init();
        SimulationConfig {
            number_of_workers,
            tick_millis,
            drain_timeout_secs: 60,
            ..Default::default()
        }
    }

    fn create_process(
        registry: &ProcessIdRegistry,
        burst_time: u32,
        memory: u32,
        observer: Arc<dyn SimulationObserver>,
    ) -> Process {
        Process::new(registry, ProcessSpec::new(0, 0, burst_time, memory), observer).unwrap()
    }

    #[test]
    fn test_add_process_normal() {
        let observer: Arc<dyn SimulationObserver> = Arc::new(NullObserver);
        let allocator = Arc::new(BestFitMemoryAllocator::with_default_blocks(
            observer.clone(),
        ));
        let registry = ProcessIdRegistry::default();
        let mut scheduler = ConcurrentWorkerPoolScheduler::new(&create_config(5, 1)).unwrap();

        assert!(scheduler.is_ready_queue_empty());
        let process = create_process(&registry, 1, 300, observer);
        let pid = process.id();
        assert!(scheduler.add_process(process, &allocator));

        assert_eq!(scheduler.ready_queue().len(), 1);
        assert_eq!(scheduler.ready_queue()[0].id, pid);
        assert_eq!(scheduler.ready_queue()[0].allocation.block_index, 1);
        assert_eq!(
            allocator.snapshot(),
            vec![100, 100, 200, 500, 250, 450, 150, 1000, 150, 550]
        );
        scheduler.execute_processes();
    }

    #[test]
    fn test_add_process_insufficient_memory_never_runs() {
        let (observer, receiver) = ChannelObserver::new();
        let observer: Arc<dyn SimulationObserver> = Arc::new(observer);
        let allocator = Arc::new(BestFitMemoryAllocator::new(vec![100], observer.clone()));
        let registry = ProcessIdRegistry::default();
        let mut scheduler = ConcurrentWorkerPoolScheduler::new(&create_config(2, 1)).unwrap();

        let process = create_process(&registry, 2, 101, observer);
        let pid = process.id();
        assert!(!scheduler.add_process(process, &allocator));
        assert!(scheduler.is_ready_queue_empty());

        let report = scheduler.execute_processes();
        assert_eq!(report.result, DrainResult::Drained);
        assert!(report.finished.is_empty());
        assert!(!receiver.try_iter().any(|event| matches!(
            event,
            SimulationEvent::StateChanged { pid: event_pid, .. } if event_pid == pid
        )));
        assert_eq!(allocator.snapshot(), vec![100]);
    }

    #[test]
    fn test_add_process_after_shutdown() {
        let observer: Arc<dyn SimulationObserver> = Arc::new(NullObserver);
        let allocator = Arc::new(BestFitMemoryAllocator::with_default_blocks(
            observer.clone(),
        ));
        let registry = ProcessIdRegistry::default();
        let mut scheduler = ConcurrentWorkerPoolScheduler::new(&create_config(1, 1)).unwrap();
        scheduler.execute_processes();

        let process = create_process(&registry, 1, 10, observer);
        assert!(!scheduler.add_process(process, &allocator));
        assert_eq!(allocator.snapshot(), DEFAULT_MEMORY_BLOCKS.to_vec());
    }

    #[test]
    fn test_execute_processes_runs_all_to_termination() {
        let observer: Arc<dyn SimulationObserver> = Arc::new(NullObserver);
        let allocator = Arc::new(BestFitMemoryAllocator::with_default_blocks(
            observer.clone(),
        ));
        let registry = ProcessIdRegistry::default();
        let mut scheduler = ConcurrentWorkerPoolScheduler::new(&create_config(5, 2)).unwrap();

        for (burst_time, memory) in [(5, 300), (3, 200), (4, 150), (7, 440), (20, 1000)] {
            assert!(scheduler.add_process(
                create_process(&registry, burst_time, memory, observer.clone()),
                &allocator
            ));
        }
        let report = scheduler.execute_processes();

        assert_eq!(report.result, DrainResult::Drained);
        assert_eq!(report.finished.len(), 5);
        for finished_job in &report.finished {
            assert_eq!(finished_job.outcome, ExecutionOutcome::Completed);
            assert_eq!(finished_job.process.state(), ProcessState::Terminated);
            assert_eq!(finished_job.process.remaining_time(), 0);
        }
        // Memory is not returned unless reclaim_memory is set.
        assert_eq!(
            allocator.snapshot(),
            vec![100, 100, 0, 500, 250, 10, 0, 0, 150, 550]
        );
    }

    #[test]
    fn test_execute_processes_reclaims_memory_when_configured() {
        let observer: Arc<dyn SimulationObserver> = Arc::new(NullObserver);
        let allocator = Arc::new(BestFitMemoryAllocator::with_default_blocks(
            observer.clone(),
        ));
        let registry = ProcessIdRegistry::default();
        let config = SimulationConfig {
            reclaim_memory: true,
            ..create_config(2, 1)
        };
        let mut scheduler = ConcurrentWorkerPoolScheduler::new(&config).unwrap();

        for memory in [1000, 300] {
            let process = create_process(&registry, 2, memory, observer.clone());
            assert!(scheduler.add_process(process, &allocator));
        }
        scheduler.execute_processes();

        assert_eq!(allocator.snapshot(), DEFAULT_MEMORY_BLOCKS.to_vec());
    }

    #[test]
    fn test_five_processes_run_concurrently_on_five_workers() {
        let (observer, receiver) = ChannelObserver::new();
        let observer: Arc<dyn SimulationObserver> = Arc::new(observer);
        let allocator = Arc::new(BestFitMemoryAllocator::new(vec![1000; 5], observer.clone()));
        let registry = ProcessIdRegistry::default();
        let mut scheduler = ConcurrentWorkerPoolScheduler::new(&create_config(5, 100)).unwrap();

        for _ in 0..5 {
            let process = create_process(&registry, 5, 10, observer.clone());
            assert!(scheduler.add_process(process, &allocator));
        }
        scheduler.execute_processes();

        let mut running = HashSet::new();
        let mut max_running = 0;
        for event in receiver.try_iter() {
            if let SimulationEvent::StateChanged { pid, state } = event {
                match state {
                    ProcessState::Running => {
                        running.insert(pid);
                    }
                    ProcessState::Terminated => {
                        running.remove(&pid);
                    }
                    ProcessState::New => {}
                }
                max_running = max_running.max(running.len());
            }
        }
        assert_eq!(max_running, 5);
    }

    #[test]
    fn test_sixth_process_waits_for_a_free_worker() {
        let (observer, receiver) = ChannelObserver::new();
        let observer: Arc<dyn SimulationObserver> = Arc::new(observer);
        let allocator = Arc::new(BestFitMemoryAllocator::new(vec![1000; 6], observer.clone()));
        let registry = ProcessIdRegistry::default();
        let mut scheduler = ConcurrentWorkerPoolScheduler::new(&create_config(5, 5)).unwrap();

        let mut pids = Vec::new();
        for _ in 0..6 {
            let process = create_process(&registry, 3, 10, observer.clone());
            pids.push(process.id());
            assert!(scheduler.add_process(process, &allocator));
        }
        let report = scheduler.execute_processes();
        assert_eq!(report.finished.len(), 6);

        let state_events: Vec<(ProcessId, ProcessState)> = receiver
            .try_iter()
            .filter_map(|event| match event {
                SimulationEvent::StateChanged { pid, state } => Some((pid, state)),
                _ => None,
            })
            .collect();
        let sixth_start = state_events
            .iter()
            .position(|&event| event == (pids[5], ProcessState::Running))
            .unwrap();
        let first_termination = state_events
            .iter()
            .position(|&(_, state)| state == ProcessState::Terminated)
            .unwrap();
        assert!(first_termination < sixth_start);
    }

    #[test]
    fn test_execute_processes_timeout_leaves_process_running() {
        let observer: Arc<dyn SimulationObserver> = Arc::new(NullObserver);
        let allocator = Arc::new(BestFitMemoryAllocator::with_default_blocks(
            observer.clone(),
        ));
        let registry = ProcessIdRegistry::default();
        let config = SimulationConfig {
            drain_timeout_secs: 0,
            ..create_config(1, 50)
        };
        let mut scheduler = ConcurrentWorkerPoolScheduler::new(&config).unwrap();

        let process = create_process(&registry, 100, 10, observer);
        assert!(scheduler.add_process(process, &allocator));
        let report = scheduler.execute_processes();

        assert_eq!(report.result, DrainResult::TimedOut);
        assert_eq!(report.finished.len(), 1);
        assert_ne!(report.finished[0].process.state(), ProcessState::Terminated);
    }
}
