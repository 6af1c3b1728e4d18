//! Per-router request identifier generation.
//!
//! Mirrors the original `next_id += rand()` increment scheme: a
//! monotonically-advancing counter perturbed by a random positive step, so
//! ids are unlikely to collide with a peer's own ids or with stale ids from
//! a prior connection, without needing a process-global RNG.

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Upper bound (inclusive) of the random per-call increment.
const MAX_STEP: i64 = 0x7fff;

/// Generates nonzero, effectively-unique 64-bit request ids.
pub struct IdGenerator {
    rng: StdRng,
    last_id: i64,
}

impl IdGenerator {
    /// Create a generator seeded from the system entropy source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            last_id: 0,
        }
    }

    /// Produce the next id. Never returns 0.
    #[must_use]
    pub fn next_id(&mut self) -> i64 {
        loop {
            let step: i64 = self.rng.gen_range(1..=MAX_STEP);
            let candidate = self.last_id.wrapping_add(step);
            if candidate != 0 {
                self.last_id = candidate;
                return candidate;
            }
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self { Self::new() }
}
