//! Error type shared by the simulation engines.
use std::time::Duration;

use thiserror::Error;

use crate::process_id::ProcessId;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Insufficient memory: no block can hold {requested} units")]
    InsufficientMemory { requested: u32 },

    #[error("Process id space {min}..={max} is exhausted")]
    IdSpaceExhausted { min: u32, max: u32 },

    #[error("Process ID: {pid} was interrupted with {remaining_time} ticks remaining")]
    ExecutionInterrupted { pid: ProcessId, remaining_time: u32 },

    #[error("Worker pool did not drain within {timeout:?}, {pending} processes cancelled")]
    PoolDrainTimeout { timeout: Duration, pending: usize },

    #[error("Worker pool no longer accepts processes")]
    PoolClosed,

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SimResult<T> = Result<T, SimError>;
