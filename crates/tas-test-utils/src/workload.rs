//! Seeded random allocate/free workloads.
//!
//! A [`Workload`] is a deterministic stream of [`Op`]s drawn from a
//! `ChaCha8Rng`; the same seed and profile always produce the same
//! sequence. A [`Replayer`] applies ops to a heap and tracks which
//! payloads are live, so `Free` ops always target a real allocation.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tas_arena::Heap;
use tas_core::{AllocError, Payload};

/// One step of a workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Request `size` payload bytes.
    Allocate { size: usize },
    /// Free the live payload at `slot % live_count`. Skipped when nothing
    /// is live.
    Free { slot: usize },
}

/// Shape of a random workload.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkloadProfile {
    /// Number of ops to generate.
    pub steps: usize,
    /// Largest requested payload size, inclusive.
    pub max_size: usize,
    /// Probability that a step frees instead of allocating.
    pub free_ratio: f64,
}

impl WorkloadProfile {
    /// Small requests against a small arena, roughly balanced.
    pub fn churn(steps: usize) -> Self {
        Self {
            steps,
            max_size: 48,
            free_ratio: 0.45,
        }
    }

    /// Mixed request sizes that provoke splitting and coalescing.
    pub fn mixed(steps: usize, max_size: usize) -> Self {
        Self {
            steps,
            max_size,
            free_ratio: 0.4,
        }
    }
}

/// Deterministic op generator.
pub struct Workload {
    rng: ChaCha8Rng,
    profile: WorkloadProfile,
    emitted: usize,
}

impl Workload {
    pub fn new(seed: u64, profile: WorkloadProfile) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            profile,
            emitted: 0,
        }
    }
}

impl Iterator for Workload {
    type Item = Op;

    fn next(&mut self) -> Option<Op> {
        if self.emitted == self.profile.steps {
            return None;
        }
        self.emitted += 1;
        let op = if self.rng.random_bool(self.profile.free_ratio) {
            Op::Free {
                slot: self.rng.random_range(0..usize::MAX),
            }
        } else {
            Op::Allocate {
                size: self.rng.random_range(0..=self.profile.max_size),
            }
        };
        Some(op)
    }
}

/// Result of applying one [`Op`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Allocated(Payload),
    Failed(AllocError),
    Freed(Payload),
    /// A `Free` op found no live payload.
    Skipped,
}

/// Applies ops to a heap and remembers the live payloads.
///
/// Each allocation is stamped with a byte derived from its sequence number
/// so [`verify_contents`](Self::verify_contents) can detect a payload that
/// was overwritten by a neighbour.
#[derive(Debug, Default)]
pub struct Replayer {
    live: Vec<(Payload, u8)>,
    next_stamp: u8,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads currently held, in allocation order.
    pub fn live(&self) -> impl Iterator<Item = Payload> + '_ {
        self.live.iter().map(|&(p, _)| p)
    }

    pub fn apply(&mut self, heap: &mut Heap, op: Op) -> Outcome {
        match op {
            Op::Allocate { size } => match heap.allocate(size) {
                Ok(p) => {
                    let stamp = self.next_stamp;
                    self.next_stamp = self.next_stamp.wrapping_add(1);
                    heap.payload_mut(p).fill(stamp);
                    self.live.push((p, stamp));
                    Outcome::Allocated(p)
                }
                Err(e) => Outcome::Failed(e),
            },
            Op::Free { slot } => {
                if self.live.is_empty() {
                    return Outcome::Skipped;
                }
                let (p, _) = self.live.swap_remove(slot % self.live.len());
                heap.deallocate(p);
                Outcome::Freed(p)
            }
        }
    }

    /// Panic if any live payload no longer holds its stamp in every byte.
    #[track_caller]
    pub fn verify_contents(&self, heap: &Heap) {
        for &(p, stamp) in &self.live {
            let bytes = heap.payload(p);
            assert!(
                bytes.iter().all(|&b| b == stamp),
                "payload {p} lost its stamp {stamp:#04x}"
            );
        }
    }

    /// Free everything still live.
    pub fn drain(&mut self, heap: &mut Heap) {
        for (p, _) in self.live.drain(..) {
            heap.deallocate(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_ops() {
        let a: Vec<Op> = Workload::new(7, WorkloadProfile::churn(64)).collect();
        let b: Vec<Op> = Workload::new(7, WorkloadProfile::churn(64)).collect();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn sizes_stay_in_range() {
        let profile = WorkloadProfile::mixed(200, 16);
        assert!(Workload::new(3, profile).all(|op| match op {
            Op::Allocate { size } => size <= 16,
            Op::Free { .. } => true,
        }));
    }

    #[test]
    fn free_on_empty_is_skipped() {
        let mut heap = crate::heap(80);
        let mut r = Replayer::new();
        assert_eq!(r.apply(&mut heap, Op::Free { slot: 3 }), Outcome::Skipped);
    }
}
