//! Error types for the tas heap simulator.
//!
//! Three classes, by how a caller is expected to react:
//! - [`AllocError`]: a request could not be served. Recoverable; the
//!   caller decides whether to retry.
//! - [`ConfigError`]: the heap could not be reserved.
//! - [`ContractViolation`]: the caller broke the usage contract (bad
//!   payload, double free). The engine panics with this value's message
//!   instead of continuing on a corrupted arena.

use std::error::Error;
use std::fmt;

use crate::id::{BlockRef, Payload};

/// Errors returned by `Heap::allocate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// Adding the header to the request overflows `usize`.
    SizeOverflow {
        /// Requested payload size in bytes.
        requested: usize,
    },
    /// The request can never fit, even in an empty arena.
    ExceedsArena {
        /// Requested payload size in bytes.
        requested: usize,
        /// Total arena capacity in bytes.
        capacity: usize,
    },
    /// No free block fits the request, even after coalescing.
    OutOfMemory {
        /// Segment size that was searched for, header included.
        required: usize,
        /// Free bytes in the arena at the time of failure.
        free_bytes: usize,
    },
}

impl AllocError {
    /// Whether retrying the same request can never succeed.
    ///
    /// Overflow errors are permanent. Out-of-memory may succeed once other
    /// blocks have been freed.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::OutOfMemory { .. })
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeOverflow { requested } => {
                write!(f, "overflow: size {requested} overflows the size type")
            }
            Self::ExceedsArena {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "overflow: size {requested} exceeds arena capacity of {capacity} bytes"
                )
            }
            Self::OutOfMemory {
                required,
                free_bytes,
            } => {
                write!(
                    f,
                    "out of memory: no free block of {required} bytes ({free_bytes} bytes free)"
                )
            }
        }
    }
}

impl Error for AllocError {}

/// Errors detected while reserving a heap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The arena cannot hold even one minimum-size block.
    ArenaTooSmall {
        /// Configured arena size in bytes.
        configured: usize,
        /// Smallest valid arena size in bytes.
        minimum: usize,
    },
    /// The arena size is not a multiple of the machine word.
    MisalignedArena {
        /// Configured arena size in bytes.
        configured: usize,
        /// Required alignment in bytes.
        word: usize,
    },
    /// The host allocator refused the arena buffer.
    HostAllocation {
        /// Size of the refused buffer in bytes.
        requested: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArenaTooSmall {
                configured,
                minimum,
            } => {
                write!(
                    f,
                    "arena size {configured} is below the minimum block size of {minimum}"
                )
            }
            Self::MisalignedArena { configured, word } => {
                write!(f, "arena size {configured} is not a multiple of {word}")
            }
            Self::HostAllocation { requested } => {
                write!(f, "host allocator refused {requested} bytes")
            }
        }
    }
}

impl Error for ConfigError {}

/// A broken usage contract.
///
/// These are programmer errors, not runtime conditions. The engine never
/// returns them from an allocation path; it panics with their message.
/// `Heap::check` reports them as values for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractViolation {
    /// The payload does not belong to any block of this arena.
    NotAPayload {
        /// The offending payload.
        payload: Payload,
    },
    /// The payload's block is already free.
    DoubleFree {
        /// The offending payload.
        payload: Payload,
    },
    /// The free-list link of a used block was requested.
    LinkOfUsedBlock {
        /// The used block.
        block: BlockRef,
    },
    /// A block expected in the free list is absent from it.
    NotInFreeList {
        /// The missing block.
        block: BlockRef,
    },
    /// A header holds a state tag that is neither free nor used.
    CorruptTag {
        /// The block whose header is corrupt.
        block: BlockRef,
        /// The tag byte found.
        tag: u8,
    },
    /// The block chain does not tile the arena exactly.
    BrokenTiling {
        /// The block at which the walk went wrong.
        block: BlockRef,
        /// Size recorded in its header.
        size: usize,
    },
    /// A free block is not reachable from the free list, or a used block is.
    FreeListMismatch {
        /// The misplaced block.
        block: BlockRef,
    },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAPayload { payload } => {
                write!(f, "payload {payload} was not returned by this heap")
            }
            Self::DoubleFree { payload } => write!(f, "payload {payload} is already free"),
            Self::LinkOfUsedBlock { block } => {
                write!(f, "block {block} is in use and has no free-list link")
            }
            Self::NotInFreeList { block } => write!(f, "block {block} is not in the free list"),
            Self::CorruptTag { block, tag } => {
                write!(f, "block {block} has corrupt state tag {tag:#04x}")
            }
            Self::BrokenTiling { block, size } => {
                write!(f, "block {block} of size {size} breaks the arena tiling")
            }
            Self::FreeListMismatch { block } => {
                write!(f, "block {block} disagrees with the free list")
            }
        }
    }
}

impl Error for ContractViolation {}
