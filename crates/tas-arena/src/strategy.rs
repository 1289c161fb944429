//! Block-selection strategies.
//!
//! Both strategies receive the free list as `(block, size)` candidates in
//! list order and the required segment size, header included. They only
//! choose; splitting and list maintenance happen in the heap.

use std::fmt;

use tas_core::BlockRef;

/// How the heap picks a free block for a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// First block in list order that is large enough.
    FirstFit,
    /// Block leaving the least slack; ties go to the earliest in list order.
    #[default]
    BestFit,
}

impl Strategy {
    /// The other strategy.
    pub fn toggled(self) -> Self {
        match self {
            Self::FirstFit => Self::BestFit,
            Self::BestFit => Self::FirstFit,
        }
    }

    /// Pick a block of at least `required` bytes among `candidates`.
    pub fn select<I>(self, candidates: I, required: usize) -> Option<BlockRef>
    where
        I: IntoIterator<Item = (BlockRef, usize)>,
    {
        match self {
            Self::FirstFit => first_fit(candidates, required),
            Self::BestFit => best_fit(candidates, required),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstFit => write!(f, "first-fit"),
            Self::BestFit => write!(f, "best-fit"),
        }
    }
}

/// First candidate whose size is at least `required`.
///
/// Stops at the first match: O(1) best case, O(n) worst case.
pub fn first_fit<I>(candidates: I, required: usize) -> Option<BlockRef>
where
    I: IntoIterator<Item = (BlockRef, usize)>,
{
    candidates
        .into_iter()
        .find(|&(_, size)| size >= required)
        .map(|(block, _)| block)
}

/// Candidate with the smallest `size - required` among those that fit.
///
/// Always scans every candidate. On equal slack the earlier candidate wins.
pub fn best_fit<I>(candidates: I, required: usize) -> Option<BlockRef>
where
    I: IntoIterator<Item = (BlockRef, usize)>,
{
    let mut best: Option<(BlockRef, usize)> = None;
    for (block, size) in candidates {
        if size < required {
            continue;
        }
        let slack = size - required;
        if best.is_none_or(|(_, s)| slack < s) {
            best = Some((block, slack));
        }
    }
    best.map(|(block, _)| block)
}
