//! Heap configuration parameters.

use tas_core::ConfigError;

use crate::block::{MIN_BLOCK_SIZE, WORD};
use crate::strategy::Strategy;

/// Configuration for a heap reservation.
///
/// Validated by [`Heap::reserve`](crate::Heap::reserve); the arena size is
/// fixed for the heap's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Total arena size in bytes, headers included.
    ///
    /// Default: 80. Must be a multiple of the machine word and at least
    /// [`MIN_BLOCK_SIZE`].
    pub arena_size: usize,

    /// Block-selection strategy installed at reservation.
    ///
    /// Default: [`Strategy::BestFit`].
    pub strategy: Strategy,
}

impl HeapConfig {
    /// Default arena size in bytes.
    pub const DEFAULT_ARENA_SIZE: usize = 80;

    /// Create a config for an arena of `arena_size` bytes with best-fit.
    pub fn new(arena_size: usize) -> Self {
        Self {
            arena_size,
            strategy: Strategy::default(),
        }
    }

    /// Replace the initial strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Check the structural constraints on the arena size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena_size < MIN_BLOCK_SIZE {
            return Err(ConfigError::ArenaTooSmall {
                configured: self.arena_size,
                minimum: MIN_BLOCK_SIZE,
            });
        }
        if self.arena_size % WORD != 0 {
            return Err(ConfigError::MisalignedArena {
                configured: self.arena_size,
                word: WORD,
            });
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ARENA_SIZE)
    }
}
