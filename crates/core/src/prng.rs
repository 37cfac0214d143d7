//! Injectable randomness for the optimizer.
//!
//! Every stochastic decision in a run (seeding, parent draws, crossover coin
//! flips, mutation deltas) goes through a single [`RandomSource`]. Production
//! runs use the seedable [`Xorshift64`]; tests can substitute any scripted
//! sequence by implementing the trait.

use serde::{Deserialize, Serialize};

/// A source of uniform random numbers.
///
/// Only [`next_f64`](RandomSource::next_f64) is required; the range and index
/// helpers are derived from it so that a scripted source stays trivial to write.
pub trait RandomSource {
    /// Returns a uniformly distributed f64 in [0, 1).
    fn next_f64(&mut self) -> f64;

    /// Returns a uniformly distributed f64 in [min, max).
    fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Returns a uniformly distributed index in [0, len).
    ///
    /// # Panics
    ///
    /// Panics if `len` is 0.
    fn next_index(&mut self, len: usize) -> usize {
        assert!(len > 0, "next_index requires a non-empty range");
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }
}

/// Xorshift64 deterministic PRNG. Same seed always produces the same sequence.
///
/// Uses the standard shift parameters (13, 7, 17). Seed of 0 is replaced with
/// a non-zero fallback to avoid the all-zeros fixed point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    const FALLBACK_SEED: u64 = 0x5EED_DEAD_BEEF_CAFE;

    /// Creates a new PRNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { Self::FALLBACK_SEED } else { seed },
        }
    }

    /// Advances the state and returns the next 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}

impl RandomSource for Xorshift64 {
    /// Upper 53 bits of `next_u64()` divided by 2^53, for full mantissa precision.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn next_index(&mut self, len: usize) -> usize {
        assert!(len > 0, "next_index requires a non-empty range");
        (self.next_u64() % len as u64) as usize
    }
}
