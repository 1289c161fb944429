//! Benchmark profiles for the tas heap engine.
//!
//! Provides pre-built [`HeapConfig`] profiles and deterministic request
//! streams for benchmarks:
//!
//! - [`reference_profile`]: 4 KiB arena, the size of a small interactive run
//! - [`stress_profile`]: 256 KiB arena with thousands of live blocks
//! - [`request_sizes`]: seeded payload sizes drawn from `ChaCha8Rng`

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tas_arena::{HeapConfig, Strategy};

/// Arena size of [`reference_profile`] in bytes.
pub const REFERENCE_ARENA: usize = 4 * 1024;

/// Arena size of [`stress_profile`] in bytes.
pub const STRESS_ARENA: usize = 256 * 1024;

/// Build a reference benchmark profile: 4 KiB arena.
pub fn reference_profile(strategy: Strategy) -> HeapConfig {
    HeapConfig::new(REFERENCE_ARENA).with_strategy(strategy)
}

/// Build a stress benchmark profile: 256 KiB arena.
///
/// Large enough that best-fit's full-list scan dominates when the free
/// list is long.
pub fn stress_profile(strategy: Strategy) -> HeapConfig {
    HeapConfig::new(STRESS_ARENA).with_strategy(strategy)
}

/// Generate `n` payload sizes in `0..=max`, deterministic per seed.
pub fn request_sizes(n: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(0..=max)).collect()
}
