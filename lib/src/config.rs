//! Simulation parameters, loadable from a yaml file.
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::memory::DEFAULT_MEMORY_BLOCKS;
use crate::util::load_yaml;

/// Inclusive range of process ids handed out during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub min: u32,
    pub max: u32,
}

impl IdRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn capacity(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.max - self.min) as u64 + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    pub fn contains(&self, id: u32) -> bool {
        (self.min..=self.max).contains(&id)
    }
}

impl Default for IdRange {
    /// Five digit ids.
    fn default() -> Self {
        Self {
            min: 10000,
            max: 99999,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub number_of_workers: usize,
    pub tick_millis: u64,
    pub drain_timeout_secs: u64,
    pub memory_blocks: Vec<u32>,
    pub id_range: IdRange,
    pub reclaim_memory: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            number_of_workers: 5,
            tick_millis: 1000,
            drain_timeout_secs: 600,
            memory_blocks: DEFAULT_MEMORY_BLOCKS.to_vec(),
            id_range: IdRange::default(),
            reclaim_memory: false,
        }
    }
}

impl SimulationConfig {
    /// load a yaml config file, filling missing keys with defaults
    ///
    /// # Example
    ///
    /// ```
    /// use lib::config::SimulationConfig;
    ///
    /// let config = SimulationConfig::from_yaml_file("tests/sample_configs/fast_simulation.yaml").unwrap();
    /// assert_eq!(config.tick_millis, 10);
    /// ```
    pub fn from_yaml_file(file_path: &str) -> SimResult<Self> {
        let config: Self = load_yaml(file_path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.number_of_workers == 0 {
            return Err(SimError::InvalidConfig(
                "number_of_workers must be at least 1".to_string(),
            ));
        }
        if self.memory_blocks.is_empty() {
            return Err(SimError::InvalidConfig(
                "memory_blocks must contain at least one block".to_string(),
            ));
        }
        if self.id_range.is_empty() {
            return Err(SimError::InvalidConfig(format!(
                "id_range {}..={} is empty",
                self.id_range.min, self.id_range.max
            )));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}
