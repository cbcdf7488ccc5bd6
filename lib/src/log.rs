use serde_derive::{Deserialize, Serialize};

use log::warn;

use crate::{
    config::SimulationConfig,
    output_log::append_info_to_yaml,
    process::{ProcessSpec, ProcessState},
    process_id::ProcessId,
    worker::{ExecutionOutcome, FinishedJob},
    worker_pool::DrainResult,
};

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SimulationInfo {
    pub number_of_workers: usize,
    pub tick_millis: u64,
    pub drain_timeout_secs: u64,
    pub reclaim_memory: bool,
    pub initial_memory_blocks: Vec<u32>,
}

impl SimulationInfo {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            number_of_workers: config.number_of_workers,
            tick_millis: config.tick_millis,
            drain_timeout_secs: config.drain_timeout_secs,
            reclaim_memory: config.reclaim_memory,
            initial_memory_blocks: config.memory_blocks.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessLog {
    pub process_id: Option<ProcessId>, // None when no id could be issued
    pub priority: i32,
    pub arrival_time: u32,
    pub burst_time: u32,
    pub memory: u32,
    pub admitted: bool,
    pub state: ProcessState,
    pub remaining_time: u32,
    pub block_index: Option<usize>,
    pub worker_id: Option<usize>,
    pub outcome: Option<ExecutionOutcome>,
}

impl ProcessLog {
    pub fn new(process_id: Option<ProcessId>, spec: &ProcessSpec, admitted: bool) -> Self {
        Self {
            process_id,
            priority: spec.priority,
            arrival_time: spec.arrival_time,
            burst_time: spec.burst_time,
            memory: spec.memory,
            admitted,
            state: ProcessState::New,
            remaining_time: spec.burst_time,
            block_index: None,
            worker_id: None,
            outcome: None,
        }
    }

    pub fn write_finishing_log(&mut self, finished_job: &FinishedJob) {
        self.state = finished_job.process.state();
        self.remaining_time = finished_job.process.remaining_time();
        self.block_index = Some(finished_job.allocation.block_index);
        self.worker_id = Some(finished_job.worker_id);
        self.outcome = Some(finished_job.outcome);
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct MemoryLog {
    pub memory_blocks: Vec<u32>,
    pub total_free_memory: u64,
}

impl MemoryLog {
    pub fn new(memory_blocks: Vec<u32>) -> Self {
        let total_free_memory = memory_blocks.iter().map(|&size| size as u64).sum();
        Self {
            memory_blocks,
            total_free_memory,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SimulationLog {
    pub simulation_info: SimulationInfo,
    pub process_logs: Vec<ProcessLog>,
    pub memory_log: MemoryLog,
    pub drain_result: DrainResult,
}

impl SimulationLog {
    pub fn admitted_count(&self) -> usize {
        self.process_logs.iter().filter(|log| log.admitted).count()
    }

    pub fn terminated_count(&self) -> usize {
        self.process_logs
            .iter()
            .filter(|log| log.state == ProcessState::Terminated)
            .count()
    }

    pub fn dump_log_to_yaml(&self, file_path: &str) {
        match serde_yaml::to_string(self) {
            Ok(yaml) => append_info_to_yaml(file_path, &yaml),
            Err(err) => warn!("Failed to serialize SimulationLog to YAML: {}", err),
        }
    }
}
