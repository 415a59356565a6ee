//! Random source for symmetric jitter.
//!
//! Each [`JitterSource`] owns its generator behind a mutex so several retry sequences can share one
//! backoff policy. Only the draw itself is serialized; callers do their arithmetic outside the lock.
//!
//! Notes:
//! - RNG: `StdRng` seeded from the OS at construction; [`JitterSource::seeded`] gives a
//!   deterministic sequence for tests.
//! - A poisoned lock is recovered rather than propagated: the generator state cannot be left
//!   half-updated by a panicking caller.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Mutex;

/// Mutex-guarded pseudo-random generator owned by a backoff policy.
pub struct JitterSource {
    rng: Mutex<StdRng>,
}

impl JitterSource {
    /// Seed from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(StdRng::from_os_rng()) }
    }

    /// Deterministic source for reproducible delays.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    /// Draw a fraction uniformly from `[-jitter/2, +jitter/2)`.
    ///
    /// `jitter == 0.0` short-circuits without touching the lock.
    pub fn fraction(&self, jitter: f64) -> f64 {
        if jitter == 0.0 {
            return 0.0;
        }
        let unit: f64 = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.random()
        };
        (unit - 0.5) * jitter
    }
}

impl Default for JitterSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl fmt::Debug for JitterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitterSource").field("rng", &"<StdRng>").finish()
    }
}
