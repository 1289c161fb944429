//! Block header layout and the header/payload conversions.
//!
//! Every segment of the arena starts with a header stored in the arena
//! bytes themselves:
//!
//! ```text
//! offset  0            WORD          2*WORD (= HEADER_SIZE)
//!         ┌────────────┬─────────────┬──────────────────────────────┐
//!         │ size       │ tag + pad   │ payload                      │
//!         └────────────┴─────────────┴──────────────────────────────┘
//!                                    ▲
//!                                    └── free: next free-list link (one word)
//!                                        used: first caller byte
//! ```
//!
//! `size` covers the whole segment, header included. The payload of a free
//! block is reused for the free-list link, so no block may ever be smaller
//! than [`MIN_BLOCK_SIZE`].

use tas_core::{BlockRef, ContractViolation, Payload};

/// Natural machine word in bytes.
pub const WORD: usize = std::mem::size_of::<usize>();

/// Size of a block header: one word for the size, one for the state tag.
///
/// Both directions of the header/payload mapping derive from this constant.
pub const HEADER_SIZE: usize = 2 * WORD;

/// Bytes needed to store a free-list link in a free block's payload.
pub const LINK_SIZE: usize = WORD;

/// Smallest payload ever handed out; a freed block must host its link.
pub const MIN_PAYLOAD: usize = LINK_SIZE;

/// Smallest segment that can stand alone in the arena.
pub const MIN_BLOCK_SIZE: usize = HEADER_SIZE + MIN_PAYLOAD;

pub(crate) const TAG_USED: u8 = 0;
pub(crate) const TAG_FREE: u8 = 1;

/// Encoding of an absent free-list link.
pub(crate) const NIL: usize = usize::MAX;

/// Decoded state of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// In the free list; `next` is the following free-list node.
    Free {
        /// Next node of the free list, `None` at the tail.
        next: Option<BlockRef>,
    },
    /// Handed out to a caller.
    Used,
}

impl BlockState {
    /// Whether the block is available for allocation.
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free { .. })
    }
}

/// A decoded block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    /// Segment size in bytes, header included.
    pub size: usize,
    /// Availability and, for free blocks, the free-list link.
    pub state: BlockState,
}

/// Payload handle of a block.
pub fn payload_of(block: BlockRef) -> Payload {
    Payload(block.0 + HEADER_SIZE)
}

/// Block owning a payload, or `None` if the offset cannot follow a header.
pub fn block_of(payload: Payload) -> Option<BlockRef> {
    payload.0.checked_sub(HEADER_SIZE).map(BlockRef)
}

/// Address of the block immediately following `block` in the arena.
pub fn next_in_memory(block: BlockRef, size: usize) -> BlockRef {
    BlockRef(block.0 + size)
}

/// Round `n` up to the next multiple of [`WORD`].
///
/// Returns `None` if the rounded value does not fit in `usize`.
pub fn align_word(n: usize) -> Option<usize> {
    Some(n.checked_add(WORD - 1)? & !(WORD - 1))
}

/// Abort on a broken usage contract.
#[track_caller]
pub(crate) fn violation(v: ContractViolation) -> ! {
    panic!("contract violation: {v}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trip_uses_header_size() {
        let b = BlockRef(48);
        let p = payload_of(b);
        assert_eq!(p.offset(), 48 + HEADER_SIZE);
        assert_eq!(block_of(p), Some(b));
    }

    #[test]
    fn payload_before_first_header_has_no_block() {
        assert_eq!(block_of(Payload(HEADER_SIZE - 1)), None);
        assert_eq!(block_of(Payload(HEADER_SIZE)), Some(BlockRef(0)));
    }

    #[test]
    fn min_block_hosts_a_link() {
        assert!(MIN_BLOCK_SIZE - HEADER_SIZE >= LINK_SIZE);
        assert_eq!(MIN_BLOCK_SIZE % WORD, 0);
    }

    #[test]
    fn align_word_rounds_up() {
        assert_eq!(align_word(0), Some(0));
        assert_eq!(align_word(1), Some(WORD));
        assert_eq!(align_word(WORD), Some(WORD));
        assert_eq!(align_word(WORD + 1), Some(2 * WORD));
        assert_eq!(align_word(usize::MAX), None);
    }

    #[test]
    fn next_in_memory_adds_size() {
        assert_eq!(next_in_memory(BlockRef(24), 32), BlockRef(56));
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn violation_panics() {
        violation(ContractViolation::NotInFreeList { block: BlockRef(0) });
    }
}
