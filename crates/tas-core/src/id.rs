//! Arena-relative identifiers.
//!
//! Nothing outside the engine ever sees a raw address. A block is named by
//! the byte offset of its header inside the arena, a live allocation by the
//! byte offset of its payload. Both stay valid until the block is freed or
//! the heap is disposed.

use std::fmt;

/// Offset of a block header inside the arena.
///
/// `BlockRef(0)` is always the first block of a reserved arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef(pub usize);

impl BlockRef {
    /// Byte offset of the header.
    pub fn offset(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:04}", self.0)
    }
}

impl From<usize> for BlockRef {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// Offset of the first payload byte of a live allocation.
///
/// Returned by a successful allocation and consumed by deallocation.
/// A `Payload` says nothing about the heap it came from; handing it to a
/// different heap is a caller error caught as a contract violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct Payload(pub usize);

impl Payload {
    /// Byte offset of the payload.
    pub fn offset(self) -> usize {
        self.0
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:04}", self.0)
    }
}

impl From<usize> for Payload {
    fn from(v: usize) -> Self {
        Self(v)
    }
}
