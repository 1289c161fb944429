//! Free-list heap engine over a single fixed-size arena.
//!
//! A [`Heap`] owns one contiguous byte arena, carved into blocks that tile
//! it exactly. Every block carries its header inside the arena; free blocks
//! reuse their payload word as the link of a singly linked free list
//! anchored by a sentinel.
//!
//! # Architecture
//!
//! ```text
//! Heap (owner, no global state)
//! ├── ArenaBuffer (Box<[u8]>, headers + links encoded in place)
//! ├── FreeList (sentinel link → free block → free block → …)
//! ├── Strategy (first-fit | best-fit, switchable at runtime)
//! └── Counters (surfaced through HeapStats)
//! ```
//!
//! # Allocation policy
//!
//! - **Split from the tail:** the allocation is the high end of the chosen
//!   block; the low end stays in the free list at the same offset.
//! - **Lazy coalescing:** freeing never merges. When a search fails, one
//!   pass merges adjacent free blocks and the search runs exactly once more.
//! - **Word granularity:** segment sizes are multiples of [`WORD`], and a
//!   payload is never smaller than one free-list link.
//!
//! Handles are arena offsets ([`BlockRef`], [`Payload`]), so no `unsafe` is
//! needed. Misuse such as a double free panics with a
//! [`ContractViolation`] message.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
mod buffer;
pub mod coalesce;
pub mod config;
mod free_list;
pub mod heap;
pub mod inspect;
pub mod strategy;

// Public re-exports for the primary API surface.
pub use block::{BlockState, HEADER_SIZE, LINK_SIZE, MIN_BLOCK_SIZE, MIN_PAYLOAD, WORD};
pub use coalesce::CoalesceReport;
pub use config::HeapConfig;
pub use heap::Heap;
pub use inspect::{BlockInfo, HeapStats, Layout};
pub use strategy::Strategy;
pub use tas_core::{AllocError, BlockRef, ConfigError, ContractViolation, Payload};
