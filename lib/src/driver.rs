//! Entry point that turns process specs into admitted, executed processes.
use std::sync::Arc;

use log::{info, warn};

use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::log::{MemoryLog, ProcessLog, SimulationInfo, SimulationLog};
use crate::memory::BestFitMemoryAllocator;
use crate::observer::SimulationObserver;
use crate::process::{Process, ProcessSpec};
use crate::process_id::ProcessIdRegistry;
use crate::scheduler::{ConcurrentWorkerPoolScheduler, SchedulingAlgorithm};

/// The fixed five-process sequence used when no process set is given.
pub fn demo_process_specs() -> Vec<ProcessSpec> {
    vec![
        ProcessSpec::new(2, 0, 5, 300),
        ProcessSpec::new(1, 2, 3, 200),
        ProcessSpec::new(6, 1, 4, 150),
        ProcessSpec::new(3, 5, 7, 440),
        ProcessSpec::new(7, 10, 20, 1000),
    ]
}

pub struct SimulationDriver<S: SchedulingAlgorithm = ConcurrentWorkerPoolScheduler> {
    config: SimulationConfig,
    id_registry: ProcessIdRegistry,
    allocator: Arc<BestFitMemoryAllocator>,
    scheduler: S,
    observer: Arc<dyn SimulationObserver>,
    process_logs: Vec<ProcessLog>,
}

impl SimulationDriver<ConcurrentWorkerPoolScheduler> {
    pub fn new(config: SimulationConfig, observer: Arc<dyn SimulationObserver>) -> SimResult<Self> {
        config.validate()?;
        let scheduler = ConcurrentWorkerPoolScheduler::new(&config)?;
        Ok(Self::with_scheduler(config, scheduler, observer))
    }
}

impl<S: SchedulingAlgorithm> SimulationDriver<S> {
    pub fn with_scheduler(
        config: SimulationConfig,
        scheduler: S,
        observer: Arc<dyn SimulationObserver>,
    ) -> Self {
        let allocator = Arc::new(BestFitMemoryAllocator::new(
            config.memory_blocks.clone(),
            observer.clone(),
        ));
        observer.on_memory_layout_changed(&allocator.snapshot());
        Self {
            id_registry: ProcessIdRegistry::new(config.id_range),
            config,
            allocator,
            scheduler,
            observer,
            process_logs: Vec::new(),
        }
    }

    pub fn allocator(&self) -> &Arc<BestFitMemoryAllocator> {
        &self.allocator
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn id_registry(&self) -> &ProcessIdRegistry {
        &self.id_registry
    }

    /// Builds a process from `spec` and offers it to the scheduler.
    ///
    /// Returns whether it was admitted. Fails only when no process id is left.
    pub fn admit(&mut self, spec: ProcessSpec) -> SimResult<bool> {
        let process = match Process::new(&self.id_registry, spec, self.observer.clone()) {
            Ok(process) => process,
            Err(err) => {
                self.process_logs.push(ProcessLog::new(None, &spec, false));
                return Err(err);
            }
        };
        let pid = process.id();
        let admitted = self.scheduler.add_process(process, &self.allocator);
        self.process_logs
            .push(ProcessLog::new(Some(pid), &spec, admitted));
        Ok(admitted)
    }

    /// Admits every spec in order, then waits for the batch to finish.
    pub fn run_batch(&mut self, specs: &[ProcessSpec]) -> SimulationLog {
        for spec in specs {
            if let Err(err) = self.admit(*spec) {
                warn!("Skipping process {:?}: {}", spec, err);
            }
        }
        info!(
            "Admitted {} of {} processes, waiting for workers",
            self.process_logs.iter().filter(|log| log.admitted).count(),
            specs.len()
        );
        self.execute()
    }

    /// Drains the scheduler and summarizes every process offered so far.
    pub fn execute(&mut self) -> SimulationLog {
        let report = self.scheduler.execute_processes();
        let mut process_logs = std::mem::take(&mut self.process_logs);
        for finished_job in &report.finished {
            let pid = finished_job.process.id();
            if let Some(process_log) = process_logs
                .iter_mut()
                .find(|log| log.process_id == Some(pid))
            {
                process_log.write_finishing_log(finished_job);
            }
        }

        SimulationLog {
            simulation_info: SimulationInfo::new(&self.config),
            process_logs,
            memory_log: MemoryLog::new(self.allocator.snapshot()),
            drain_result: report.result,
        }
    }
}
