//! Test utilities for tas development.
//!
//! Provides an invariant checker ([`assert_invariants`]), heap fixtures in
//! known shapes ([`fixtures`]) and seeded random workloads ([`workload`])
//! for driving the engine through long allocate/free sequences.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod workload;

use tas_arena::{Heap, MIN_BLOCK_SIZE, WORD};

pub use fixtures::{fragmented_heap, heap, heap_with};
pub use workload::{Op, Outcome, Replayer, Workload, WorkloadProfile};

/// Panic with a descriptive message if `heap` breaks a structural invariant.
///
/// Runs [`Heap::check`] and then cross-checks the inspection views against
/// each other:
/// - block sizes sum to the capacity and are word multiples of at least
///   [`MIN_BLOCK_SIZE`];
/// - free bytes reported by [`Heap::stats`] match the free blocks walked
///   in address order.
#[track_caller]
pub fn assert_invariants(heap: &Heap) {
    if let Err(v) = heap.check() {
        panic!("heap invariant broken: {v}\nlayout: {:?}", heap.layout());
    }

    let mut total = 0;
    let mut free_in_arena = 0;
    for info in heap.blocks() {
        assert!(
            info.size >= MIN_BLOCK_SIZE && info.size % WORD == 0,
            "block {} has size {}",
            info.block,
            info.size
        );
        total += info.size;
        if info.is_free() {
            free_in_arena += info.size;
        }
    }
    assert_eq!(total, heap.capacity(), "blocks do not tile the arena");

    let stats = heap.stats();
    assert_eq!(stats.free_bytes, free_in_arena, "free list misses bytes");
    assert_eq!(stats.used_bytes + stats.free_bytes, stats.capacity);
}
