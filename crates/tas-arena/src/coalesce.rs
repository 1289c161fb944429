//! The coalescing pass.
//!
//! Freeing never merges neighbours, so the arena slowly fragments into
//! runs of adjacent free blocks. This pass walks the whole arena in
//! address order, folds every maximal run into its first block and
//! rebuilds the free list from the merged blocks. Used blocks are stepped
//! over untouched.

use log::trace;
use tas_core::BlockRef;

use crate::block::next_in_memory;
use crate::buffer::ArenaBuffer;
use crate::free_list::FreeList;

/// What a coalescing pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoalesceReport {
    /// Free blocks in the rebuilt list.
    pub free_blocks: usize,
    /// Blocks absorbed into a preceding free neighbour.
    pub merged: usize,
}

/// Merge adjacent free blocks and rebuild `list`. O(blocks in arena).
pub(crate) fn coalesce(buf: &mut ArenaBuffer, list: &mut FreeList) -> CoalesceReport {
    list.clear();
    let end = buf.len();
    let mut report = CoalesceReport::default();
    let mut p = BlockRef(0);

    while p.0 < end {
        let size = buf.segment_size(p);
        if !buf.is_free(p) {
            p = next_in_memory(p, size);
            continue;
        }

        let mut run = size;
        let mut q = next_in_memory(p, size);
        while q.0 < end && buf.is_free(q) {
            let q_size = buf.segment_size(q);
            run += q_size;
            report.merged += 1;
            q = next_in_memory(q, q_size);
        }
        if run != size {
            trace!("coalesce: {p} grows {size} -> {run}");
            buf.set_size(p, run);
        }
        list.insert_head(buf, p);
        report.free_blocks += 1;
        p = q;
    }

    report
}
