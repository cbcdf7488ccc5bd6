//! Notification interface between the engines and whatever renders them.
//!
//! Observers are called synchronously from worker threads and from admission,
//! so implementations must return quickly. `ChannelObserver` moves events onto
//! a channel for consumers that render on a single thread.
use log::{debug, info};
use serde_derive::{Deserialize, Serialize};

use crate::process::ProcessState;
use crate::process_id::ProcessId;

pub trait SimulationObserver: Send + Sync {
    fn on_state_changed(&self, pid: ProcessId, state: ProcessState);
    fn on_progress(&self, pid: ProcessId, remaining_time: u32, max_time: u32);
    fn on_memory_layout_changed(&self, block_sizes: &[u32]);
}

/// Fraction of burst time already executed. A zero burst counts as complete.
pub fn progress_fraction(remaining_time: u32, max_time: u32) -> f32 {
    if max_time == 0 {
        return 1.0;
    }
    (max_time - remaining_time.min(max_time)) as f32 / max_time as f32
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SimulationObserver for NullObserver {
    fn on_state_changed(&self, _pid: ProcessId, _state: ProcessState) {}
    fn on_progress(&self, _pid: ProcessId, _remaining_time: u32, _max_time: u32) {}
    fn on_memory_layout_changed(&self, _block_sizes: &[u32]) {}
}

/// Reports every event through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SimulationObserver for LogObserver {
    fn on_state_changed(&self, pid: ProcessId, state: ProcessState) {
        info!("Process ID: {} | State: {}", pid, state);
    }

    fn on_progress(&self, pid: ProcessId, remaining_time: u32, max_time: u32) {
        debug!(
            "Process ID: {} | Remaining Time: {} | Progress: {:.0}%",
            pid,
            remaining_time,
            progress_fraction(remaining_time, max_time) * 100.0
        );
    }

    fn on_memory_layout_changed(&self, block_sizes: &[u32]) {
        info!("Memory blocks: {:?}", block_sizes);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    StateChanged {
        pid: ProcessId,
        state: ProcessState,
    },
    Progress {
        pid: ProcessId,
        remaining_time: u32,
        max_time: u32,
    },
    MemoryLayoutChanged {
        block_sizes: Vec<u32>,
    },
}

/// Forwards events over an unbounded channel; sends never block the caller
/// and are dropped once the receiver is gone.
#[derive(Clone)]
pub struct ChannelObserver {
    sender: flume::Sender<SimulationEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, flume::Receiver<SimulationEvent>) {
        let (sender, receiver) = flume::unbounded();
        (Self { sender }, receiver)
    }

    fn publish(&self, event: SimulationEvent) {
        let _ = self.sender.send(event);
    }
}

impl SimulationObserver for ChannelObserver {
    fn on_state_changed(&self, pid: ProcessId, state: ProcessState) {
        self.publish(SimulationEvent::StateChanged { pid, state });
    }

    fn on_progress(&self, pid: ProcessId, remaining_time: u32, max_time: u32) {
        self.publish(SimulationEvent::Progress {
            pid,
            remaining_time,
            max_time,
        });
    }

    fn on_memory_layout_changed(&self, block_sizes: &[u32]) {
        self.publish(SimulationEvent::MemoryLayoutChanged {
            block_sizes: block_sizes.to_vec(),
        });
    }
}
