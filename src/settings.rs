//! Plain-data retry settings.
//!
//! [`RetrySettings`] is what a host application embeds in its own configuration; with the `serde`
//! feature it deserializes from any serde format, durations in milliseconds. Missing fields take
//! the documented defaults. Loading the data (files, flags, environment) is the host's job.

use crate::backoff::{
    ExponentialBackoff, DEFAULT_FACTOR, DEFAULT_JITTER, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY,
};
use crate::error::RetryError;
use crate::retry::{execute_with_value, RetryConfig};
use crate::signal::{Cancellation, Signal};
use crate::timeout::execute_with_timeout;
use std::error::Error;
use std::future::Future;
use std::time::Duration;

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BackoffSettings {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
    pub jitter: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: millis(DEFAULT_MIN_DELAY),
            max_delay_ms: millis(DEFAULT_MAX_DELAY),
            factor: DEFAULT_FACTOR,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl BackoffSettings {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn build(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.min_delay(), self.max_delay(), self.factor, self.jitter)
    }
}

/// Retry parameters: attempt budget, backoff, optional per-attempt timeout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff: BackoffSettings,
    /// Per-attempt bound applied by [`RetrySettings::execute`]; `None` leaves attempts unbounded.
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: RetryConfig::<std::io::Error>::DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffSettings::default(),
            attempt_timeout_ms: None,
        }
    }
}

impl RetrySettings {
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }

    /// Runtime config with a freshly seeded backoff policy and default classification.
    pub fn to_config<E>(&self) -> RetryConfig<E> {
        RetryConfig::new(self.backoff.build()).max_attempts(self.max_attempts)
    }

    /// Run `operation` with `config`, bounding each attempt by `attempt_timeout_ms` when set.
    ///
    /// The operation receives the attempt's signal: a timed child of `signal`, or a clone of
    /// `signal` itself when no attempt timeout is configured.
    pub async fn execute<T, E, Fut, Op>(
        &self,
        signal: &Signal,
        config: &RetryConfig<E>,
        mut operation: Op,
    ) -> Result<T, RetryError<E>>
    where
        E: Error + From<Cancellation> + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>>,
        Op: FnMut(Signal) -> Fut,
    {
        match self.attempt_timeout() {
            Some(timeout) => execute_with_timeout(signal, config, timeout, operation).await,
            None => execute_with_value(signal, config, || operation(signal.clone())).await,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
