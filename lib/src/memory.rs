//! Best-fit allocation over a fixed list of memory blocks.
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use serde_derive::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::observer::SimulationObserver;

pub const DEFAULT_MEMORY_BLOCKS: [u32; 10] = [100, 400, 200, 500, 250, 450, 150, 1000, 150, 550];

/// A successful grant: `size` units taken from block `block_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub block_index: usize,
    pub size: u32,
}

/// Index of the smallest block that can hold `requested_size`.
/// Equal candidates resolve to the one scanned first.
pub fn find_best_fit(block_sizes: &[u32], requested_size: u32) -> Option<usize> {
    block_sizes
        .iter()
        .enumerate()
        .filter(|(_, &block_size)| block_size >= requested_size)
        .min_by_key(|(_, &block_size)| block_size)
        .map(|(block_index, _)| block_index)
}

pub struct BestFitMemoryAllocator {
    blocks: Mutex<Vec<u32>>,
    initial_blocks: Vec<u32>,
    observer: Arc<dyn SimulationObserver>,
}

impl BestFitMemoryAllocator {
    pub fn new(block_sizes: Vec<u32>, observer: Arc<dyn SimulationObserver>) -> Self {
        Self {
            initial_blocks: block_sizes.clone(),
            blocks: Mutex::new(block_sizes),
            observer,
        }
    }

    pub fn with_default_blocks(observer: Arc<dyn SimulationObserver>) -> Self {
        Self::new(DEFAULT_MEMORY_BLOCKS.to_vec(), observer)
    }

    /// Takes `requested_size` out of the best-fitting block.
    ///
    /// Scan and decrement happen under one lock so two admissions can never
    /// be granted the same space. The observer receives a copy of the new layout after the lock is
    /// released, so it may call back into the allocator.
    pub fn try_allocate(&self, requested_size: u32) -> SimResult<Allocation> {
        let (block_index, layout) = {
            let mut blocks = self.blocks.lock();
            let block_index = find_best_fit(&blocks, requested_size).ok_or(
                SimError::InsufficientMemory {
                    requested: requested_size,
                },
            )?;
            debug!(
                "Allocating {} units from block {} ({} free)",
                requested_size, block_index, blocks[block_index]
            );
            blocks[block_index] -= requested_size;
            (block_index, blocks.clone())
        };
        self.observer.on_memory_layout_changed(&layout);
        Ok(Allocation {
            block_index,
            size: requested_size,
        })
    }

    pub fn allocate(&self, requested_size: u32) -> bool {
        self.try_allocate(requested_size).is_ok()
    }

    /// Gives an allocation back to its block, never beyond the block's initial size.
    pub fn release(&self, allocation: Allocation) {
        let layout = {
            let mut blocks = self.blocks.lock();
            let Some(block_size) = blocks.get_mut(allocation.block_index) else {
                warn!(
                    "Ignoring release for unknown block {}",
                    allocation.block_index
                );
                return;
            };
            let initial_size = self.initial_blocks[allocation.block_index];
            *block_size = block_size.saturating_add(allocation.size).min(initial_size);
            blocks.clone()
        };
        self.observer.on_memory_layout_changed(&layout);
    }

    pub fn snapshot(&self) -> Vec<u32> {
        self.blocks.lock().clone()
    }

    pub fn initial_blocks(&self) -> &[u32] {
        &self.initial_blocks
    }

    pub fn total_free(&self) -> u64 {
        self.blocks.lock().iter().map(|&size| size as u64).sum()
    }
}
