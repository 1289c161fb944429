//! The arena byte buffer and in-place header accessors.
//!
//! [`ArenaBuffer`] owns the fixed-size arena. Headers and free-list links
//! are encoded in native-endian words directly inside it; nothing about a
//! block lives outside the arena.

use std::ops::Range;

use tas_core::{BlockRef, ConfigError, ContractViolation};

use crate::block::{
    violation, Block, BlockState, HEADER_SIZE, MIN_BLOCK_SIZE, NIL, TAG_FREE, TAG_USED, WORD,
};

/// Fixed-size arena storage.
///
/// Allocated once at reservation and never resized.
pub(crate) struct ArenaBuffer {
    bytes: Box<[u8]>,
}

impl ArenaBuffer {
    /// Allocate a zeroed arena of `size` bytes.
    ///
    /// Host allocation failure is reported instead of aborting.
    pub(crate) fn new(size: usize) -> Result<Self, ConfigError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| ConfigError::HostAllocation { requested: size })?;
        bytes.resize(size, 0);
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Total arena size in bytes.
    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether `block` starts a header that fits inside the arena.
    pub(crate) fn holds_header(&self, block: BlockRef) -> bool {
        block
            .0
            .checked_add(HEADER_SIZE)
            .is_some_and(|end| end <= self.bytes.len())
    }

    fn word(&self, at: usize) -> usize {
        let mut w = [0u8; WORD];
        w.copy_from_slice(&self.bytes[at..at + WORD]);
        usize::from_ne_bytes(w)
    }

    fn set_word(&mut self, at: usize, value: usize) {
        self.bytes[at..at + WORD].copy_from_slice(&value.to_ne_bytes());
    }

    fn tag(&self, block: BlockRef) -> u8 {
        self.bytes[block.0 + WORD]
    }

    pub(crate) fn size(&self, block: BlockRef) -> usize {
        self.word(block.0)
    }

    /// Size of `block`, checked against the arena tiling.
    ///
    /// # Panics
    ///
    /// Panics if the size is below [`MIN_BLOCK_SIZE`] or runs past the end
    /// of the arena; an arena walk could not make progress from there.
    pub(crate) fn segment_size(&self, block: BlockRef) -> usize {
        let size = self.size(block);
        if size < MIN_BLOCK_SIZE || size > self.len() - block.0 {
            violation(ContractViolation::BrokenTiling { block, size });
        }
        size
    }

    pub(crate) fn set_size(&mut self, block: BlockRef, size: usize) {
        self.set_word(block.0, size);
    }

    /// Whether `block` is available.
    ///
    /// # Panics
    ///
    /// Panics if the header's tag is neither free nor used.
    pub(crate) fn is_free(&self, block: BlockRef) -> bool {
        match self.tag(block) {
            TAG_FREE => true,
            TAG_USED => false,
            tag => violation(ContractViolation::CorruptTag { block, tag }),
        }
    }

    pub(crate) fn mark_used(&mut self, block: BlockRef) {
        self.bytes[block.0 + WORD] = TAG_USED;
    }

    /// Mark `block` available. Its link must be set before it is traversed.
    pub(crate) fn mark_free(&mut self, block: BlockRef) {
        self.bytes[block.0 + WORD] = TAG_FREE;
    }

    /// Free-list successor of `block`.
    ///
    /// # Panics
    ///
    /// Panics if `block` is in use: a used block's payload holds caller
    /// data, not a link.
    pub(crate) fn next_free(&self, block: BlockRef) -> Option<BlockRef> {
        if !self.is_free(block) {
            violation(ContractViolation::LinkOfUsedBlock { block });
        }
        match self.word(block.0 + HEADER_SIZE) {
            NIL => None,
            offset => Some(BlockRef(offset)),
        }
    }

    /// Overwrite the free-list successor of `block`.
    ///
    /// # Panics
    ///
    /// Panics if `block` is in use.
    pub(crate) fn set_next_free(&mut self, block: BlockRef, next: Option<BlockRef>) {
        if !self.is_free(block) {
            violation(ContractViolation::LinkOfUsedBlock { block });
        }
        self.set_word(block.0 + HEADER_SIZE, next.map_or(NIL, |b| b.0));
    }

    /// Decode the header at `block`, reporting a corrupt tag as a value.
    pub(crate) fn try_read(&self, block: BlockRef) -> Result<Block, ContractViolation> {
        let size = self.size(block);
        let state = match self.tag(block) {
            TAG_USED => BlockState::Used,
            TAG_FREE => BlockState::Free {
                next: self.next_free(block),
            },
            tag => return Err(ContractViolation::CorruptTag { block, tag }),
        };
        Ok(Block { size, state })
    }

    /// Decode the header at `block`.
    ///
    /// # Panics
    ///
    /// Panics if the header is corrupt.
    pub(crate) fn read(&self, block: BlockRef) -> Block {
        self.try_read(block).unwrap_or_else(|v| violation(v))
    }

    pub(crate) fn bytes(&self, range: Range<usize>) -> &[u8] {
        &self.bytes[range]
    }

    pub(crate) fn bytes_mut(&mut self, range: Range<usize>) -> &mut [u8] {
        &mut self.bytes[range]
    }
}
