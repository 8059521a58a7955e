//! Deterministic simulation RNG.
//!
//! Every random draw in a run (order positions, the traffic event) comes from
//! one `SimRng` seeded from the configured seed, or from a child derived from
//! it.  Same seed, same build ⇒ same sequence of draws.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Simulation-level RNG.
///
/// Used only in single-threaded or explicitly synchronised contexts.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive an independent stream for a sub-system.
    ///
    /// Depends only on the root seed and `offset`, not on how many draws the
    /// parent has made, so adding draws to one sub-system does not shift
    /// another's sequence.
    pub fn stream(seed: u64, offset: u64) -> SimRng {
        SimRng(SmallRng::seed_from_u64(seed ^ offset.wrapping_mul(MIXING_CONSTANT)))
    }

    /// Sample a uniformly distributed value of any `Standard`-distributed type.
    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }
}
