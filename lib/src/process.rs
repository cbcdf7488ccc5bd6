//! Simulated process: identity, timing, memory demand and its run state machine.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use getset::CopyGetters;
use log::info;
use serde_derive::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::observer::{progress_fraction, SimulationObserver};
use crate::process_id::{ProcessId, ProcessIdRegistry};
use crate::util::load_yaml;
use crate::worker::CancellationToken;

/// States only move forward: New -> Running -> Terminated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    #[default]
    New,
    Running,
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::New => "NEW",
            ProcessState::Running => "RUNNING",
            ProcessState::Terminated => "TERMINATED",
        };
        write!(f, "{}", name)
    }
}

/// What a process needs to be built: the driver turns each spec into a `Process`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub priority: i32,
    pub arrival_time: u32,
    pub burst_time: u32,
    pub memory: u32,
}

impl ProcessSpec {
    pub fn new(priority: i32, arrival_time: u32, burst_time: u32, memory: u32) -> Self {
        Self {
            priority,
            arrival_time,
            burst_time,
            memory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSet {
    pub processes: Vec<ProcessSpec>,
}

impl ProcessSet {
    /// load a process set from a yaml file
    ///
    /// # Example
    ///
    /// ```
    /// use lib::process::ProcessSet;
    ///
    /// let process_set = ProcessSet::from_yaml_file("tests/sample_processes/demo_processes.yaml").unwrap();
    /// let first_burst_time = process_set.processes[0].burst_time;
    /// ```
    pub fn from_yaml_file(file_path: &str) -> SimResult<Self> {
        load_yaml(file_path)
    }
}

#[derive(CopyGetters)]
pub struct Process {
    #[getset(get_copy = "pub")]
    id: ProcessId,
    #[getset(get_copy = "pub")]
    priority: i32,
    #[getset(get_copy = "pub")]
    arrival_time: u32,
    #[getset(get_copy = "pub")]
    burst_time: u32,
    #[getset(get_copy = "pub")]
    remaining_time: u32,
    #[getset(get_copy = "pub")]
    memory: u32,
    #[getset(get_copy = "pub")]
    state: ProcessState,
    observer: Arc<dyn SimulationObserver>,
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("arrival_time", &self.arrival_time)
            .field("burst_time", &self.burst_time)
            .field("remaining_time", &self.remaining_time)
            .field("memory", &self.memory)
            .field("state", &self.state)
            .finish()
    }
}

impl Process {
    pub fn new(
        id_registry: &ProcessIdRegistry,
        spec: ProcessSpec,
        observer: Arc<dyn SimulationObserver>,
    ) -> SimResult<Self> {
        Ok(Self {
            id: id_registry.next_id()?,
            priority: spec.priority,
            arrival_time: spec.arrival_time,
            burst_time: spec.burst_time,
            remaining_time: spec.burst_time,
            memory: spec.memory,
            state: ProcessState::New,
            observer,
        })
    }

    pub fn spec(&self) -> ProcessSpec {
        ProcessSpec::new(self.priority, self.arrival_time, self.burst_time, self.memory)
    }

    pub fn progress(&self) -> f32 {
        progress_fraction(self.remaining_time, self.burst_time)
    }

    /// Runs the process to completion on the calling thread.
    ///
    /// Each tick takes one unit off the remaining time, reports progress and
    /// then sleeps for `tick`. If `cancel` fires during a sleep the countdown
    /// stops where it is, the process stays `Running`, and
    /// `ExecutionInterrupted` is returned.
    pub fn execute(&mut self, tick: Duration, cancel: &CancellationToken) -> SimResult<()> {
        self.set_state(ProcessState::Running);
        info!("Process ID: {} is starting.", self.id);

        if self.burst_time == 0 {
            self.observer.on_progress(self.id, 0, 0);
        }
        while self.remaining_time > 0 {
            self.remaining_time -= 1;
            self.observer
                .on_progress(self.id, self.remaining_time, self.burst_time);
            if !cancel.sleep(tick) {
                return Err(SimError::ExecutionInterrupted {
                    pid: self.id,
                    remaining_time: self.remaining_time,
                });
            }
        }

        self.set_state(ProcessState::Terminated);
        info!("Process ID: {} has terminated.", self.id);
        Ok(())
    }

    fn set_state(&mut self, state: ProcessState) {
        debug_assert!(state > self.state, "{} -> {}", self.state, state);
        self.state = state;
        self.observer.on_state_changed(self.id, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{ChannelObserver, NullObserver, SimulationEvent};

    fn create_process(burst_time: u32, observer: Arc<dyn SimulationObserver>) -> Process {
        let registry = ProcessIdRegistry::default();
        Process::new(&registry, ProcessSpec::new(2, 0, burst_time, 300), observer).unwrap()
    }

    #[test]
    fn test_process_new() {
        let process = create_process(5, Arc::new(NullObserver));
        assert_eq!(process.state(), ProcessState::New);
        assert_eq!(process.remaining_time(), 5);
        assert_eq!(process.burst_time(), 5);
        assert_eq!(process.memory(), 300);
        assert_eq!(process.priority(), 2);
        assert_eq!(process.arrival_time(), 0);
        assert_eq!(process.progress(), 0.0);
        assert_eq!(process.spec(), ProcessSpec::new(2, 0, 5, 300));
    }

    #[test]
    fn test_process_new_id_space_exhausted() {
        let registry = ProcessIdRegistry::new(crate::config::IdRange::new(1, 1));
        let spec = ProcessSpec::new(0, 0, 1, 1);
        assert!(Process::new(&registry, spec, Arc::new(NullObserver)).is_ok());
        assert!(matches!(
            Process::new(&registry, spec, Arc::new(NullObserver)),
            Err(SimError::IdSpaceExhausted { .. })
        ));
    }

    #[test]
    fn test_process_execute_normal() {
        let (observer, receiver) = ChannelObserver::new();
        let mut process = create_process(3, Arc::new(observer));
        let pid = process.id();

        process
            .execute(Duration::from_millis(1), &CancellationToken::new())
            .unwrap();

        assert_eq!(process.state(), ProcessState::Terminated);
        assert_eq!(process.remaining_time(), 0);
        assert_eq!(process.progress(), 1.0);

        let events: Vec<SimulationEvent> = receiver.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SimulationEvent::StateChanged {
                    pid,
                    state: ProcessState::Running
                },
                SimulationEvent::Progress {
                    pid,
                    remaining_time: 2,
                    max_time: 3
                },
                SimulationEvent::Progress {
                    pid,
                    remaining_time: 1,
                    max_time: 3
                },
                SimulationEvent::Progress {
                    pid,
                    remaining_time: 0,
                    max_time: 3
                },
                SimulationEvent::StateChanged {
                    pid,
                    state: ProcessState::Terminated
                },
            ]
        );
    }

    #[test]
    fn test_process_execute_zero_burst() {
        let (observer, receiver) = ChannelObserver::new();
        let mut process = create_process(0, Arc::new(observer));
        process
            .execute(Duration::from_secs(10), &CancellationToken::new())
            .unwrap();

        assert_eq!(process.state(), ProcessState::Terminated);
        let progress_events = receiver
            .try_iter()
            .filter(|event| matches!(event, SimulationEvent::Progress { .. }))
            .count();
        assert_eq!(progress_events, 1);
    }

    #[test]
    fn test_process_execute_cancelled() {
        let mut process = create_process(5, Arc::new(NullObserver));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = process.execute(Duration::from_secs(10), &cancel);

        assert!(matches!(
            result,
            Err(SimError::ExecutionInterrupted {
                remaining_time: 4,
                ..
            })
        ));
        assert_eq!(process.state(), ProcessState::Running);
        assert_eq!(process.remaining_time(), 4);
    }

    #[test]
    fn test_process_state_display() {
        assert_eq!(ProcessState::New.to_string(), "NEW");
        assert_eq!(ProcessState::Running.to_string(), "RUNNING");
        assert_eq!(ProcessState::Terminated.to_string(), "TERMINATED");
        assert!(ProcessState::New < ProcessState::Running);
        assert!(ProcessState::Running < ProcessState::Terminated);
    }

    #[test]
    fn test_process_set_from_yaml_file() {
        let process_set =
            ProcessSet::from_yaml_file("tests/sample_processes/demo_processes.yaml").unwrap();
        assert_eq!(
            process_set.processes[0],
            ProcessSpec::new(2, 0, 5, 300)
        );
        assert_eq!(process_set.processes.len(), 5);
    }
}
