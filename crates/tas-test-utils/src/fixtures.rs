//! Heaps in known shapes.
//!
//! - [`heap`]: fresh best-fit heap of a given size.
//! - [`heap_with`]: fresh heap with an explicit strategy.
//! - [`fragmented_heap`]: arena of minimum blocks, every other one free.

use tas_arena::{Heap, HeapConfig, Strategy, MIN_BLOCK_SIZE, MIN_PAYLOAD};
use tas_core::Payload;

/// Fresh heap of `arena_size` bytes with the default strategy.
pub fn heap(arena_size: usize) -> Heap {
    heap_with(arena_size, Strategy::default())
}

/// Fresh heap of `arena_size` bytes using `strategy`.
pub fn heap_with(arena_size: usize, strategy: Strategy) -> Heap {
    Heap::reserve(HeapConfig::new(arena_size).with_strategy(strategy))
        .unwrap_or_else(|e| panic!("fixture heap of {arena_size} bytes: {e}"))
}

/// Heap of `blocks` minimum-size blocks where every other block is free.
///
/// Allocation proceeds from the tail, so the block at offset 0 is the last
/// one handed out. Blocks at even positions (0, 2M, 4M, ...) are freed.
/// Returns the heap and the payloads still live, in address order.
///
/// No two free blocks are adjacent, so a request for more than one
/// minimum block fails even after coalescing.
pub fn fragmented_heap(blocks: usize, strategy: Strategy) -> (Heap, Vec<Payload>) {
    let mut heap = heap_with(blocks * MIN_BLOCK_SIZE, strategy);
    let mut payloads: Vec<Payload> = (0..blocks)
        .map(|i| {
            heap.allocate(MIN_PAYLOAD)
                .unwrap_or_else(|e| panic!("filling block {i}: {e}"))
        })
        .collect();
    payloads.reverse();

    let mut live = Vec::with_capacity(blocks / 2);
    for (i, p) in payloads.into_iter().enumerate() {
        if i % 2 == 0 {
            heap.deallocate(p);
        } else {
            live.push(p);
        }
    }
    (heap, live)
}
