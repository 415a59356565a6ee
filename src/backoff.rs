//! Exponential backoff with bounded, proportional jitter.
//!
//! Delay semantics: the retry loop waits [`Backoff::min_delay`] before the first retry and feeds
//! each delay it used back into [`Backoff::next_delay`] to obtain the following one.
//!
//! [`ExponentialBackoff::next_delay`] computes, in order:
//! 1. `previous` raised to `min_delay` if below it;
//! 2. `raw = previous * factor`, capped at `max_delay`;
//! 3. `raw += raw * r` with `r` uniform in `[-jitter/2, +jitter/2)`;
//! 4. the result clamped into `[min_delay, max_delay]`.
//!
//! Jitter scales with the delay, so it neither swamps short delays nor vanishes on long ones. The
//! clamp after jitter keeps the published bounds even for huge factors or `jitter > 1`.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use backoff_retry::{Backoff, ExponentialBackoff};
//!
//! let backoff = ExponentialBackoff::new(
//!     Duration::from_millis(100),
//!     Duration::from_secs(1),
//!     2.0,
//!     0.0,
//! );
//! assert_eq!(backoff.min_delay(), Duration::from_millis(100));
//! assert_eq!(backoff.next_delay(Duration::from_millis(100)), Duration::from_millis(200));
//! assert_eq!(backoff.next_delay(Duration::from_millis(800)), Duration::from_secs(1)); // capped
//! ```
//!
//! Bounds are not validated: `min_delay > max_delay` resolves through the clamp order (values
//! below the floor become `min_delay`, everything else `max_delay`).

use crate::jitter::JitterSource;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default floor: 100ms.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);
/// Default ceiling: 10s.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);
/// Default growth factor.
pub const DEFAULT_FACTOR: f64 = 2.0;
/// Default jitter, as a fraction of the computed delay.
pub const DEFAULT_JITTER: f64 = 0.1;

/// Capability the retry loop needs from a backoff policy.
pub trait Backoff: Send + Sync + fmt::Debug {
    /// Delay before the first retry.
    fn min_delay(&self) -> Duration;

    /// Delay to use after waiting `previous`.
    fn next_delay(&self, previous: Duration) -> Duration;
}

impl<B> Backoff for Arc<B>
where
    B: Backoff + ?Sized,
{
    fn min_delay(&self) -> Duration {
        (**self).min_delay()
    }

    fn next_delay(&self, previous: Duration) -> Duration {
        (**self).next_delay(previous)
    }
}

/// Exponential backoff policy. Safe to share between concurrent retry sequences.
#[derive(Debug)]
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    factor: f64,
    jitter: f64,
    rng: JitterSource,
}

impl ExponentialBackoff {
    /// Create a policy seeded from OS entropy.
    pub fn new(min_delay: Duration, max_delay: Duration, factor: f64, jitter: f64) -> Self {
        Self::with_source(min_delay, max_delay, factor, jitter, JitterSource::from_entropy())
    }

    /// Create a policy whose jitter sequence is reproducible.
    pub fn with_seed(
        min_delay: Duration,
        max_delay: Duration,
        factor: f64,
        jitter: f64,
        seed: u64,
    ) -> Self {
        Self::with_source(min_delay, max_delay, factor, jitter, JitterSource::seeded(seed))
    }

    fn with_source(
        min_delay: Duration,
        max_delay: Duration,
        factor: f64,
        jitter: f64,
        rng: JitterSource,
    ) -> Self {
        Self { min_delay, max_delay, factor, jitter, rng }
    }

    /// 100ms floor, 10s ceiling, factor 2.0, jitter 0.1.
    pub fn standard() -> Self {
        Self::new(DEFAULT_MIN_DELAY, DEFAULT_MAX_DELAY, DEFAULT_FACTOR, DEFAULT_JITTER)
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn clamp(&self, nanos: f64) -> Duration {
        // `!(a >= b)` also routes NaN to the floor.
        if !(nanos >= as_nanos_f64(self.min_delay)) {
            return self.min_delay;
        }
        if nanos >= as_nanos_f64(self.max_delay) {
            return self.max_delay;
        }
        Duration::from_nanos(nanos as u64)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::standard()
    }
}

impl Backoff for ExponentialBackoff {
    fn min_delay(&self) -> Duration {
        self.min_delay
    }

    fn next_delay(&self, previous: Duration) -> Duration {
        let previous = previous.max(self.min_delay);

        let max = as_nanos_f64(self.max_delay);
        let mut nanos = as_nanos_f64(previous) * self.factor;
        if nanos.is_nan() || nanos > max {
            nanos = max;
        }

        nanos += nanos * self.rng.fraction(self.jitter);
        self.clamp(nanos)
    }
}

fn as_nanos_f64(duration: Duration) -> f64 {
    duration.as_nanos() as f64
}
