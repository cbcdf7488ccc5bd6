//! Run-scoped process id registry.
use std::collections::HashSet;
use std::fmt;

use log::debug;
use parking_lot::Mutex;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};

use crate::config::IdRange;
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out random ids that are unique within one simulation run.
///
/// Candidates are drawn uniformly from the configured range and redrawn on
/// collision. Issued ids are never returned to the pool.
pub struct ProcessIdRegistry {
    range: IdRange,
    issued: Mutex<HashSet<u32>>,
}

impl ProcessIdRegistry {
    pub fn new(range: IdRange) -> Self {
        Self {
            range,
            issued: Mutex::new(HashSet::new()),
        }
    }

    pub fn next_id(&self) -> SimResult<ProcessId> {
        let mut issued = self.issued.lock();
        // A free id must exist before sampling, otherwise the loop never ends.
        if issued.len() as u64 >= self.range.capacity() {
            return Err(SimError::IdSpaceExhausted {
                min: self.range.min,
                max: self.range.max,
            });
        }
        let mut rng = rand::thread_rng();
        let mut attempts = 1;
        loop {
            let candidate = rng.gen_range(self.range.min..=self.range.max);
            if issued.insert(candidate) {
                if attempts > 1 {
                    debug!("Process id {} issued after {} draws", candidate, attempts);
                }
                return Ok(ProcessId(candidate));
            }
            attempts += 1;
        }
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.issued.lock().contains(&id.0)
    }

    pub fn issued_count(&self) -> usize {
        self.issued.lock().len()
    }
}

impl Default for ProcessIdRegistry {
    fn default() -> Self {
        Self::new(IdRange::default())
    }
}
