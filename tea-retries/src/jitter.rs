//! Random sources for jittered backoff.
//!
//! Randomized policies never touch a global generator. The caller injects a
//! [`JitterSource`] so that one source can be shared by many concurrent
//! operations, and so tests can pin the sequence with a seed.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Source of uniform samples used by randomized backoff policies.
pub trait JitterSource: Send + Sync + fmt::Debug {
    /// Uniform sample in `[0, 1)`.
    fn unit(&self) -> f64;
}

/// Draws from the calling thread's generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl ThreadRngJitter {
    /// Create a new thread-local jitter source.
    pub fn new() -> Self {
        Self
    }
}

impl JitterSource for ThreadRngJitter {
    fn unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Deterministic source seeded once and shared behind a lock.
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl fmt::Debug for SeededJitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededJitter").finish_non_exhaustive()
    }
}

impl SeededJitter {
    /// Create a source that replays the same sequence for the same seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn unit(&self) -> f64 {
        self.rng.lock().gen::<f64>()
    }
}

/// Uniform integer in `[0, span)`, or 0 when the span is empty.
pub(crate) fn uniform_below(jitter: &dyn JitterSource, span: u64) -> u64 {
    if span == 0 {
        return 0;
    }
    let sample = (jitter.unit() * span as f64) as u64;
    // keep the upper bound exclusive even if the product rounds up to span
    sample.min(span - 1)
}
