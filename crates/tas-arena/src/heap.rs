//! The heap engine: reservation, allocation, deallocation, disposal.
//!
//! [`Heap`] bundles the arena, the free-list sentinel and the selected
//! strategy into one owned value. Reserving creates it, dropping or
//! [`dispose`](Heap::dispose) releases it; there is no global state.
//!
//! The lifecycle of the arena is:
//! 1. `reserve()`: one free block spans the whole arena.
//! 2. `allocate()`: the strategy picks a free block. If none fits, the
//!    coalescing pass runs and the search is retried exactly once. The
//!    chosen block is split from its tail, or handed over whole when the
//!    remainder could not stand alone.
//! 3. `deallocate()`: the block is marked free and pushed on the free
//!    list head. Neighbours are never merged here.

use log::{debug, info, warn};
use tas_core::{AllocError, BlockRef, ConfigError, ContractViolation, Payload};

use crate::block::{
    align_word, block_of, next_in_memory, payload_of, violation, BlockState, HEADER_SIZE,
    MIN_BLOCK_SIZE, MIN_PAYLOAD, WORD,
};
use crate::buffer::ArenaBuffer;
use crate::coalesce::{coalesce, CoalesceReport};
use crate::config::HeapConfig;
use crate::free_list::FreeList;
use crate::strategy::Strategy;

/// Operation counters, reported through [`HeapStats`](crate::HeapStats).
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Counters {
    pub(crate) allocations: u64,
    pub(crate) frees: u64,
    pub(crate) failed_allocations: u64,
    pub(crate) coalesce_passes: u64,
}

/// A simulated heap over one fixed-size arena.
///
/// # Example
///
/// ```
/// use tas_arena::{Heap, HeapConfig};
///
/// let mut heap = Heap::reserve(HeapConfig::default()).unwrap();
/// let p = heap.allocate(10).unwrap();
/// heap.payload_mut(p)[0] = b'A';
/// heap.deallocate(p);
/// assert!(heap.allocate(10).is_ok());
/// ```
pub struct Heap {
    /// Arena storage; every block header lives here.
    pub(crate) buffer: ArenaBuffer,
    /// Free-list sentinel.
    pub(crate) free_list: FreeList,
    /// Active block-selection strategy.
    strategy: Strategy,
    pub(crate) counters: Counters,
}

impl Heap {
    /// Reserve the arena and install the configured strategy.
    ///
    /// The arena starts as a single free block covering all of it.
    pub fn reserve(config: HeapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut buffer = ArenaBuffer::new(config.arena_size)?;

        let first = BlockRef(0);
        buffer.set_size(first, config.arena_size);
        buffer.mark_free(first);
        let mut free_list = FreeList::new();
        free_list.insert_head(&mut buffer, first);

        info!(
            "reserved {} byte arena (header {HEADER_SIZE}, min block {MIN_BLOCK_SIZE}, {})",
            config.arena_size, config.strategy
        );
        Ok(Self {
            buffer,
            free_list,
            strategy: config.strategy,
            counters: Counters::default(),
        })
    }

    /// Release the arena. Every outstanding [`Payload`] becomes meaningless.
    pub fn dispose(self) {
        info!(
            "disposed {} byte arena after {} allocations and {} frees",
            self.buffer.len(),
            self.counters.allocations,
            self.counters.frees
        );
    }

    /// Total arena size in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The active strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Install `strategy`. Existing allocations are unaffected.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    /// Switch between first-fit and best-fit, returning the new strategy.
    pub fn toggle_strategy(&mut self) -> Strategy {
        self.strategy = self.strategy.toggled();
        info!("switched to {}", self.strategy);
        self.strategy
    }

    /// Allocate `size` payload bytes.
    ///
    /// The returned payload is at least `size` bytes long (see
    /// [`payload`](Self::payload) for its exact extent) and never moves
    /// until it is freed.
    pub fn allocate(&mut self, size: usize) -> Result<Payload, AllocError> {
        let required = self.required_size(size)?;

        let block = match self.find(required) {
            Some(block) => block,
            None => {
                self.coalesce();
                match self.find(required) {
                    Some(block) => block,
                    None => {
                        self.counters.failed_allocations += 1;
                        let free_bytes = self.free_bytes();
                        warn!("allocate({size}): no free block of {required} bytes");
                        return Err(AllocError::OutOfMemory {
                            required,
                            free_bytes,
                        });
                    }
                }
            }
        };

        let carved = self.split(block, required);
        self.buffer.mark_used(carved);
        self.counters.allocations += 1;
        Ok(payload_of(carved))
    }

    /// Segment size needed for a `size`-byte request, header included.
    fn required_size(&self, size: usize) -> Result<usize, AllocError> {
        if size.checked_add(HEADER_SIZE + WORD - 1).is_none() {
            return Err(AllocError::SizeOverflow { requested: size });
        }
        let capacity = self.buffer.len();
        if size > capacity - HEADER_SIZE {
            return Err(AllocError::ExceedsArena {
                requested: size,
                capacity,
            });
        }

        let payload = size.max(MIN_PAYLOAD);
        let required = align_word(payload + HEADER_SIZE)
            .ok_or(AllocError::SizeOverflow { requested: size })?;
        if required != size + HEADER_SIZE {
            debug!(
                "allocate({size}): segment raised to {required} (+{})",
                required - size - HEADER_SIZE
            );
        }
        Ok(required)
    }

    /// Ask the active strategy for a free block of at least `required` bytes.
    fn find(&self, required: usize) -> Option<BlockRef> {
        let buf = &self.buffer;
        let candidates = self.free_list.iter(buf).map(|b| (b, buf.size(b)));
        self.strategy.select(candidates, required)
    }

    /// Carve `required` bytes out of the free `block`.
    ///
    /// The carved segment is the tail of `block`; the head stays in the
    /// free list, shrunk, at its original offset. When the remainder would
    /// be smaller than a standalone block, the whole block is taken instead.
    fn split(&mut self, block: BlockRef, required: usize) -> BlockRef {
        let size = self.buffer.size(block);
        let remainder = size - required;

        if remainder < MIN_BLOCK_SIZE {
            self.free_list.remove(&mut self.buffer, block);
            if remainder > 0 {
                debug!(
                    "allocate: whole block {block} taken, segment raised to {size} (+{remainder})"
                );
            }
            return block;
        }

        self.buffer.set_size(block, remainder);
        let carved = next_in_memory(block, remainder);
        self.buffer.set_size(carved, required);
        carved
    }

    /// Return a payload to the free list. `None` is a no-op.
    ///
    /// The block is pushed on the free-list head as is; adjacent free
    /// blocks are merged only by the next failing allocation.
    ///
    /// # Panics
    ///
    /// Panics if the payload was not returned by this heap or is already
    /// free.
    pub fn deallocate(&mut self, payload: impl Into<Option<Payload>>) {
        let Some(payload) = payload.into() else {
            return;
        };
        let block = self.owning_block(payload).unwrap_or_else(|v| violation(v));
        self.buffer.mark_free(block);
        self.free_list.insert_head(&mut self.buffer, block);
        self.counters.frees += 1;
    }

    /// Merge adjacent free blocks and rebuild the free list.
    ///
    /// Runs automatically when an allocation finds no fitting block.
    pub fn coalesce(&mut self) -> CoalesceReport {
        let report = coalesce(&mut self.buffer, &mut self.free_list);
        self.counters.coalesce_passes += 1;
        debug!(
            "coalesce: {} free blocks, {} merged",
            report.free_blocks, report.merged
        );
        report
    }

    /// The bytes of a live payload, up to the end of its block.
    ///
    /// # Panics
    ///
    /// Panics if the payload is not live in this heap.
    pub fn payload(&self, payload: Payload) -> &[u8] {
        let block = self.owning_block(payload).unwrap_or_else(|v| violation(v));
        let end = block.0 + self.buffer.size(block);
        self.buffer.bytes(payload.0..end)
    }

    /// Mutable access to the bytes of a live payload.
    ///
    /// # Panics
    ///
    /// Panics if the payload is not live in this heap.
    pub fn payload_mut(&mut self, payload: Payload) -> &mut [u8] {
        let block = self.owning_block(payload).unwrap_or_else(|v| violation(v));
        let end = block.0 + self.buffer.size(block);
        self.buffer.bytes_mut(payload.0..end)
    }

    /// Resolve a payload to its used block.
    ///
    /// Checks bounds and alignment, then walks the arena to confirm the
    /// header sits on a block boundary before trusting its state tag.
    fn owning_block(&self, payload: Payload) -> Result<BlockRef, ContractViolation> {
        let block = block_of(payload)
            .filter(|b| b.0 % WORD == 0 && self.buffer.holds_header(*b))
            .ok_or(ContractViolation::NotAPayload { payload })?;
        if !self.is_block_boundary(block) {
            return Err(ContractViolation::NotAPayload { payload });
        }
        match self.buffer.try_read(block)?.state {
            BlockState::Used => Ok(block),
            BlockState::Free { .. } => Err(ContractViolation::DoubleFree { payload }),
        }
    }

    fn is_block_boundary(&self, target: BlockRef) -> bool {
        let mut p = BlockRef(0);
        while p < target {
            p = next_in_memory(p, self.buffer.segment_size(p));
        }
        p == target
    }

    /// Sum of the sizes of the blocks in the free list.
    pub(crate) fn free_bytes(&self) -> usize {
        self.free_list
            .iter(&self.buffer)
            .map(|b| self.buffer.size(b))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: usize = MIN_BLOCK_SIZE;

    fn heap(size: usize) -> Heap {
        Heap::reserve(HeapConfig::new(size)).unwrap()
    }

    /// (offset, size, free) for every block in address order.
    fn shape(heap: &Heap) -> Vec<(usize, usize, bool)> {
        let mut out = Vec::new();
        let mut p = BlockRef(0);
        while p.0 < heap.capacity() {
            let size = heap.buffer.size(p);
            out.push((p.0, size, heap.buffer.is_free(p)));
            p = next_in_memory(p, size);
        }
        out
    }

    fn free_list(heap: &Heap) -> Vec<usize> {
        heap.free_list.iter(&heap.buffer).map(|b| b.0).collect()
    }

    #[test]
    fn reserve_creates_one_free_block() {
        let h = heap(80);
        assert_eq!(shape(&h), vec![(0, 80, true)]);
        assert_eq!(free_list(&h), vec![0]);
        assert_eq!(h.strategy(), Strategy::BestFit);
    }

    #[test]
    fn reserve_rejects_invalid_config() {
        assert!(matches!(
            Heap::reserve(HeapConfig::new(M - WORD)),
            Err(ConfigError::ArenaTooSmall { .. })
        ));
    }

    #[test]
    fn allocation_is_carved_from_the_tail() {
        let mut h = heap(4 * M);
        let p = h.allocate(MIN_PAYLOAD).unwrap();
        assert_eq!(p, Payload(3 * M + HEADER_SIZE));
        assert_eq!(shape(&h), vec![(0, 3 * M, true), (3 * M, M, false)]);
        assert_eq!(free_list(&h), vec![0]);
    }

    #[test]
    fn small_remainder_hands_over_whole_block() {
        // Remainder of one word cannot hold a block.
        let mut h = heap(M + WORD);
        let p = h.allocate(0).unwrap();
        assert_eq!(p, Payload(HEADER_SIZE));
        assert_eq!(shape(&h), vec![(0, M + WORD, false)]);
        assert!(free_list(&h).is_empty());
        assert_eq!(h.payload(p).len(), M + WORD - HEADER_SIZE);
    }

    #[test]
    fn exact_fit_takes_block_without_split() {
        let mut h = heap(M);
        let _ = h.allocate(MIN_PAYLOAD).unwrap();
        assert_eq!(shape(&h), vec![(0, M, false)]);
    }

    #[test]
    fn zero_size_gets_room_for_a_link() {
        let mut h = heap(3 * M);
        let a = h.allocate(0).unwrap();
        let b = h.allocate(0).unwrap();
        assert_eq!(h.payload(a).len(), MIN_PAYLOAD);
        h.payload_mut(b).fill(0xAB);
        h.deallocate(a);
        let a2 = h.allocate(0).unwrap();
        assert_eq!(a2, a);
        assert!(h.payload(b).iter().all(|&x| x == 0xAB));
    }

    #[test]
    fn requests_are_word_rounded() {
        let mut h = heap(8 * M);
        let p = h.allocate(MIN_PAYLOAD + 1).unwrap();
        assert_eq!(h.payload(p).len(), MIN_PAYLOAD + WORD);
        assert_eq!(p.offset() % WORD, 0);
    }

    #[test]
    fn overflow_is_permanent_failure() {
        let mut h = heap(80);
        let e = h.allocate(usize::MAX).unwrap_err();
        assert_eq!(e, AllocError::SizeOverflow { requested: usize::MAX });
        assert!(e.is_permanent());
    }

    #[test]
    fn larger_than_arena_fails_without_coalescing() {
        let mut h = heap(80);
        let e = h.allocate(80 - HEADER_SIZE + 1).unwrap_err();
        assert_eq!(
            e,
            AllocError::ExceedsArena {
                requested: 80 - HEADER_SIZE + 1,
                capacity: 80
            }
        );
        assert_eq!(h.counters.coalesce_passes, 0);
    }

    #[test]
    fn whole_arena_payload_fits() {
        let mut h = heap(80);
        let p = h.allocate(80 - HEADER_SIZE).unwrap();
        assert_eq!(p, Payload(HEADER_SIZE));
        assert!(h.allocate(0).is_err());
    }

    #[test]
    fn free_pushes_on_head_without_merging() {
        let mut h = heap(4 * M);
        let a = h.allocate(MIN_PAYLOAD).unwrap();
        let b = h.allocate(MIN_PAYLOAD).unwrap();
        h.deallocate(a);
        h.deallocate(b);
        // Blocks at 3M and 2M are free but stay separate.
        assert_eq!(free_list(&h), vec![2 * M, 3 * M, 0]);
        assert_eq!(
            shape(&h),
            vec![(0, 2 * M, true), (2 * M, M, true), (3 * M, M, true)]
        );
    }

    #[test]
    fn none_is_a_no_op() {
        let mut h = heap(80);
        h.deallocate(None::<Payload>);
        assert_eq!(h.counters.frees, 0);
        assert_eq!(shape(&h), vec![(0, 80, true)]);
    }

    #[test]
    fn failed_search_coalesces_and_retries() {
        let mut h = heap(3 * M);
        let a = h.allocate(MIN_PAYLOAD).unwrap();
        let b = h.allocate(MIN_PAYLOAD).unwrap();
        let _c = h.allocate(MIN_PAYLOAD).unwrap();
        h.deallocate(a);
        h.deallocate(b);
        // Two adjacent free blocks of M; the request needs 2M.
        let p = h.allocate(M + MIN_PAYLOAD).unwrap();
        assert_eq!(h.counters.coalesce_passes, 1);
        assert_eq!(p, Payload(M + HEADER_SIZE));
        assert_eq!(shape(&h), vec![(0, M, false), (M, 2 * M, false)]);
    }

    #[test]
    fn out_of_memory_after_useless_coalesce() {
        let mut h = heap(80);
        let _a = h.allocate(40).unwrap();
        let e = h.allocate(40).unwrap_err();
        assert!(matches!(e, AllocError::OutOfMemory { .. }));
        assert!(!e.is_permanent());
        assert_eq!(h.counters.coalesce_passes, 1);
        assert_eq!(h.counters.failed_allocations, 1);
    }

    /// Free list [0 (2M), 3M (M)] over [free 2M][used M][free M].
    fn diverging_heap(strategy: Strategy) -> Heap {
        let mut h = heap(4 * M);
        let x = h.allocate(MIN_PAYLOAD).unwrap(); // @3M
        let _y = h.allocate(MIN_PAYLOAD).unwrap(); // @2M
        h.deallocate(x);
        h.free_list.remove(&mut h.buffer, BlockRef(0));
        h.free_list.insert_head(&mut h.buffer, BlockRef(0));
        assert_eq!(free_list(&h), vec![0, 3 * M]);
        h.set_strategy(strategy);
        h
    }

    #[test]
    fn first_fit_takes_head_block_and_splits_it() {
        let mut h = diverging_heap(Strategy::FirstFit);
        assert_eq!(h.allocate(0).unwrap(), Payload(M + HEADER_SIZE));
        assert_eq!(free_list(&h), vec![0, 3 * M]);
    }

    #[test]
    fn best_fit_takes_tightest_block() {
        let mut h = diverging_heap(Strategy::BestFit);
        assert_eq!(h.allocate(0).unwrap(), Payload(3 * M + HEADER_SIZE));
        assert_eq!(free_list(&h), vec![0]);
    }

    #[test]
    fn toggle_flips_strategy() {
        let mut h = heap(80);
        assert_eq!(h.toggle_strategy(), Strategy::FirstFit);
        assert_eq!(h.toggle_strategy(), Strategy::BestFit);
    }

    #[test]
    #[should_panic(expected = "is already free")]
    fn double_free_panics() {
        let mut h = heap(80);
        let p = h.allocate(8).unwrap();
        h.deallocate(p);
        h.deallocate(p);
    }

    #[test]
    #[should_panic(expected = "was not returned by this heap")]
    fn out_of_range_payload_panics() {
        let mut h = heap(80);
        h.deallocate(Payload(4096));
    }

    #[test]
    #[should_panic(expected = "was not returned by this heap")]
    fn misaligned_payload_panics() {
        let mut h = heap(80);
        let p = h.allocate(8).unwrap();
        h.deallocate(Payload(p.offset() + 1));
    }

    #[test]
    #[should_panic(expected = "was not returned by this heap")]
    fn interior_payload_panics() {
        let mut h = heap(8 * M);
        let p = h.allocate(4 * M).unwrap();
        h.payload_mut(p).fill(0);
        h.deallocate(Payload(p.offset() + 2 * M));
    }

    #[test]
    fn interior_payload_leaves_heap_untouched() {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let mut h = heap(8 * M);
        let p = h.allocate(4 * M).unwrap();
        h.payload_mut(p).fill(0);
        let before = shape(&h);
        let freed = catch_unwind(AssertUnwindSafe(|| {
            h.deallocate(Payload(p.offset() + 2 * M));
        }));
        assert!(freed.is_err());
        assert_eq!(shape(&h), before);
        assert_eq!(free_list(&h), vec![0]);
        assert!(h.payload(p).iter().all(|&x| x == 0));
        assert_eq!(h.counters.frees, 0);
    }

    #[test]
    fn payload_spans_to_block_end() {
        let mut h = heap(80);
        let p = h.allocate(20).unwrap();
        let len = h.payload(p).len();
        assert!(len >= 20);
        assert_eq!(len % WORD, 0);
    }
}
