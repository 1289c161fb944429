//! Tas: a heap allocator simulator over a single fixed-size arena.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the tas sub-crates. For most users, adding `tas` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tas::prelude::*;
//!
//! let mut heap = Heap::reserve(HeapConfig::new(160)).unwrap();
//! let a = heap.allocate(10).unwrap();
//! let b = heap.allocate(20).unwrap();
//! heap.deallocate(a);
//!
//! // Allocations come from the tail of the arena.
//! assert!(b.offset() < a.offset());
//! assert_eq!(heap.toggle_strategy(), Strategy::FirstFit);
//!
//! for block in heap.blocks() {
//!     println!("{} {} bytes, free: {}", block.block, block.size, block.is_free());
//! }
//! assert_eq!(heap.check(), Ok(()));
//! heap.dispose();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `tas-arena` | Heap engine, strategies, coalescing, inspection |
//! | [`types`] | `tas-core` | Arena identifiers and error types |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Heap engine and inspection views (`tas-arena`).
pub use tas_arena as arena;

/// Identifiers and error types (`tas-core`).
pub use tas_core as types;

/// Common imports for typical tas usage.
///
/// ```rust
/// use tas::prelude::*;
/// ```
pub mod prelude {
    // Engine
    pub use tas_arena::{
        BlockInfo, BlockState, CoalesceReport, Heap, HeapConfig, HeapStats, Strategy,
    };

    // Identifiers
    pub use tas_core::{BlockRef, Payload};

    // Errors
    pub use tas_core::{AllocError, ConfigError, ContractViolation};
}
