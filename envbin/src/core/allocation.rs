//! Append-only memory pool for memory-pressure faults
//!
//! Blocks are written page by page as they are created so the host has to
//! commit them, then kept for the life of the process. Nothing is ever freed.

use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{FaultError, FaultResult};

/// Stride used to touch every page; smaller than or equal to any real page size
pub const TOUCH_STRIDE: usize = 4096;

const TOUCH_BYTE: u8 = 69;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub blocks: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Default)]
pub struct AllocationPool {
    blocks: Mutex<Vec<Box<[u8]>>>,
    total_bytes: AtomicU64,
}

impl AllocationPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and touch a block of `bytes`, then keep it forever.
    ///
    /// Returns the pool total after the append.
    pub fn allocate(&self, bytes: u64) -> FaultResult<u64> {
        let len = usize::try_from(bytes).map_err(|_| FaultError::AllocationFailed { bytes })?;

        let mut block = Vec::new();
        block
            .try_reserve_exact(len)
            .map_err(|_| FaultError::AllocationFailed { bytes })?;
        block.resize(len, 0u8);

        for offset in (0..len).step_by(TOUCH_STRIDE) {
            block[offset] = TOUCH_BYTE;
        }

        let mut blocks = self.blocks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        blocks.push(block.into_boxed_slice());
        Ok(self.total_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn block_count(&self) -> usize {
        self.blocks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            blocks: self.block_count(),
            total_bytes: self.total_bytes(),
        }
    }

    /// Sizes of every block, in allocation order
    pub fn block_sizes(&self) -> Vec<usize> {
        self.blocks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|block| block.len())
            .collect()
    }
}
