//! Read-only views of a heap: block walks, statistics, invariant checks.
//!
//! Nothing here mutates the arena. Renderers and test tooling build on
//! [`Heap::blocks`] (address order) and [`Heap::free_blocks`] (free-list
//! order).

use smallvec::SmallVec;
use tas_core::{BlockRef, ContractViolation, Payload};

use crate::block::{next_in_memory, payload_of, BlockState, HEADER_SIZE, MIN_BLOCK_SIZE};
use crate::buffer::ArenaBuffer;
use crate::free_list::FreeListIter;
use crate::heap::Heap;

/// One block as seen by a walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Header offset.
    pub block: BlockRef,
    /// Segment size, header included.
    pub size: usize,
    /// Decoded state, with the free-list link for free blocks.
    pub state: BlockState,
}

impl BlockInfo {
    /// Whether the block is available.
    pub fn is_free(&self) -> bool {
        self.state.is_free()
    }

    /// Payload bytes the block can hold.
    pub fn capacity(&self) -> usize {
        self.size - HEADER_SIZE
    }

    /// Payload handle of a used block.
    pub fn payload(&self) -> Option<Payload> {
        match self.state {
            BlockState::Used => Some(payload_of(self.block)),
            BlockState::Free { .. } => None,
        }
    }
}

/// Snapshot of all blocks in address order.
///
/// Small arenas hold a handful of blocks, so the snapshot usually stays
/// inline.
pub type Layout = SmallVec<[BlockInfo; 8]>;

/// Address-order walk over every block of the arena.
pub struct Blocks<'a> {
    buf: &'a ArenaBuffer,
    next: BlockRef,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        if self.next.0 >= self.buf.len() {
            return None;
        }
        let block = self.next;
        let size = self.buf.segment_size(block);
        let state = self.buf.read(block).state;
        self.next = next_in_memory(block, size);
        Some(BlockInfo { block, size, state })
    }
}

/// Free-list-order walk over the available blocks.
pub struct FreeBlocks<'a> {
    buf: &'a ArenaBuffer,
    inner: FreeListIter<'a>,
}

impl Iterator for FreeBlocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        let block = self.inner.next()?;
        let b = self.buf.read(block);
        Some(BlockInfo {
            block,
            size: b.size,
            state: b.state,
        })
    }
}

/// Occupancy and activity figures for a heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Arena size in bytes.
    pub capacity: usize,
    /// Bytes in used blocks, headers included.
    pub used_bytes: usize,
    /// Bytes in free blocks, headers included.
    pub free_bytes: usize,
    /// Blocks in the arena.
    pub block_count: usize,
    /// Blocks in the free list.
    pub free_block_count: usize,
    /// Largest free block, 0 when none.
    pub largest_free: usize,
    /// Successful allocations since reservation.
    pub allocations: u64,
    /// Deallocations since reservation, no-ops excluded.
    pub frees: u64,
    /// Allocations that failed with out-of-memory.
    pub failed_allocations: u64,
    /// Coalescing passes run, automatic or explicit.
    pub coalesce_passes: u64,
}

impl HeapStats {
    /// Share of free bytes outside the largest free block, in `[0, 1]`.
    ///
    /// 0 means all free space is contiguous in one block.
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free as f64 / self.free_bytes as f64
    }
}

impl Heap {
    /// Walk every block in address order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            buf: &self.buffer,
            next: BlockRef(0),
        }
    }

    /// Walk the free list from the sentinel.
    pub fn free_blocks(&self) -> FreeBlocks<'_> {
        FreeBlocks {
            buf: &self.buffer,
            inner: self.free_list.iter(&self.buffer),
        }
    }

    /// Collect [`blocks`](Self::blocks) into a snapshot.
    pub fn layout(&self) -> Layout {
        self.blocks().collect()
    }

    /// Current occupancy and counters.
    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            capacity: self.capacity(),
            allocations: self.counters.allocations,
            frees: self.counters.frees,
            failed_allocations: self.counters.failed_allocations,
            coalesce_passes: self.counters.coalesce_passes,
            ..HeapStats::default()
        };
        for info in self.blocks() {
            stats.block_count += 1;
            if !info.is_free() {
                stats.used_bytes += info.size;
            }
        }
        for info in self.free_blocks() {
            stats.free_block_count += 1;
            stats.free_bytes += info.size;
            stats.largest_free = stats.largest_free.max(info.size);
        }
        stats
    }

    /// Verify the structural invariants without panicking.
    ///
    /// - The blocks tile the arena exactly: sizes are at least
    ///   [`MIN_BLOCK_SIZE`], never run past the end, and sum to the capacity.
    /// - Every header carries a valid state tag.
    /// - The free list visits each free block exactly once and nothing else.
    pub fn check(&self) -> Result<(), ContractViolation> {
        let buf = &self.buffer;
        let end = buf.len();

        let mut free = Vec::new();
        let mut p = BlockRef(0);
        while p.0 < end {
            if !buf.holds_header(p) {
                return Err(ContractViolation::BrokenTiling { block: p, size: 0 });
            }
            let size = buf.size(p);
            if size < MIN_BLOCK_SIZE || size > end - p.0 {
                return Err(ContractViolation::BrokenTiling { block: p, size });
            }
            if buf.try_read(p)?.state.is_free() {
                free.push(p);
            }
            p = next_in_memory(p, size);
        }

        // `free` is sorted by offset; mark each one as the list reaches it.
        let mut seen = vec![false; free.len()];
        let mut next = self.free_list.first();
        while let Some(block) = next {
            let Ok(i) = free.binary_search(&block) else {
                return Err(ContractViolation::FreeListMismatch { block });
            };
            if seen[i] {
                return Err(ContractViolation::FreeListMismatch { block });
            }
            seen[i] = true;
            next = match buf.try_read(block)?.state {
                BlockState::Free { next } => next,
                BlockState::Used => return Err(ContractViolation::FreeListMismatch { block }),
            };
        }
        match seen.iter().position(|&s| !s) {
            Some(i) => Err(ContractViolation::FreeListMismatch { block: free[i] }),
            None => Ok(()),
        }
    }
}
