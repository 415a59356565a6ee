//! Retry executor
//!
//! Drives a fallible async operation until it succeeds, its error is classified as
//! non-retryable, the attempt budget runs out, or the governing [`Signal`] fires.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries); `0` behaves as `1`.
//! - The first wait is [`Backoff::min_delay`]; each later wait is `next_delay` of the previous.
//! - The signal is checked before every attempt, after every failure (ahead of classification),
//!   and raced against every wait.
//! - Without a predicate, [`classify::is_recoverable`] decides whether to continue.
//! - `on_retry(attempt, error, delay)` runs once per scheduled retry, before its wait, with the
//!   1-based number of the attempt that just failed.
//!
//! Invariants:
//! - The operation runs at least once and at most `max_attempts` times, never concurrently.
//! - `on_retry` runs at most `max_attempts - 1` times and never after the final attempt.
//! - Exactly one terminal outcome per call.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use backoff_retry::{execute_with_value, ExponentialBackoff, RetryConfig, Signal};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let config = RetryConfig::new(ExponentialBackoff::new(
//!     Duration::from_millis(1),
//!     Duration::from_millis(10),
//!     2.0,
//!     0.1,
//! ))
//! .max_attempts(3);
//!
//! let mut calls = 0;
//! let value = execute_with_value(&Signal::new(), &config, || {
//!     calls += 1;
//!     let n = calls;
//!     async move {
//!         if n < 2 {
//!             Err(std::io::Error::new(std::io::ErrorKind::Other, "flaky"))
//!         } else {
//!             Ok(n)
//!         }
//!     }
//! })
//! .await
//! .unwrap();
//! assert_eq!(value, 2);
//! # });
//! ```

use crate::backoff::Backoff;
use crate::classify::{self, Temporary};
use crate::error::{ConfigError, RetryError};
use crate::signal::{Cancellation, Signal};
use crate::sleeper::{Sleeper, TokioSleeper};
use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether an error is worth another attempt.
pub type RecoverablePredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Observes each scheduled retry: `(attempt, error, delay)`.
pub type RetryObserver<E> = Arc<dyn Fn(u32, &E, Duration) + Send + Sync>;

/// Per-invocation retry configuration.
pub struct RetryConfig<E> {
    max_attempts: u32,
    backoff: Option<Arc<dyn Backoff>>,
    is_recoverable: Option<RecoverablePredicate<E>>,
    on_retry: Option<RetryObserver<E>>,
    sleeper: Arc<dyn Sleeper>,
}

impl<E> std::fmt::Debug for RetryConfig<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("is_recoverable", &self.is_recoverable.as_ref().map(|_| "<predicate>"))
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<observer>"))
            .field("sleeper", &self.sleeper)
            .finish()
    }
}

impl<E> Clone for RetryConfig<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff.clone(),
            is_recoverable: self.is_recoverable.clone(),
            on_retry: self.on_retry.clone(),
            sleeper: self.sleeper.clone(),
        }
    }
}

/// No backoff: executing with it reports [`ConfigError::MissingBackoff`].
impl<E> Default for RetryConfig<E> {
    fn default() -> Self {
        Self {
            max_attempts: RetryConfig::<E>::DEFAULT_MAX_ATTEMPTS,
            backoff: None,
            is_recoverable: None,
            on_retry: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

impl<E> RetryConfig<E> {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Three attempts, default classification, tokio timer.
    pub fn new<B>(backoff: B) -> Self
    where
        B: Backoff + 'static,
    {
        Self::default().backoff(backoff)
    }

    /// Set total attempts (initial + retries). `0` is treated as `1`.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the backoff policy. Pass an `Arc` to share one policy between configs.
    pub fn backoff<B>(mut self, backoff: B) -> Self
    where
        B: Backoff + 'static,
    {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Replace the default recoverability rule.
    pub fn is_recoverable<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.is_recoverable = Some(Arc::new(predicate));
        self
    }

    /// Observe each scheduled retry. Replaces any previous observer.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &E, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Attempts that will actually be allowed.
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn backoff_policy(&self) -> Option<&Arc<dyn Backoff>> {
        self.backoff.as_ref()
    }
}

impl<E> RetryConfig<E>
where
    E: Error + Send + Sync + 'static,
{
    /// Resolved recoverability for `err`: the configured predicate, else the default rule.
    pub fn recoverable(&self, err: &E) -> bool {
        match &self.is_recoverable {
            Some(predicate) => predicate(err),
            None => classify::is_recoverable(err),
        }
    }

    /// Log every scheduled retry at `warn`, then call the previously configured observer.
    pub fn with_logging(mut self) -> Self {
        let previous = self.on_retry.take();
        self.on_retry = Some(Arc::new(move |attempt: u32, err: &E, delay: Duration| {
            tracing::warn!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "retrying after error"
            );
            if let Some(previous) = &previous {
                previous(attempt, err, delay);
            }
        }));
        self
    }

    /// Treat temporary errors as recoverable; defer everything else to the existing predicate
    /// (or the default rule).
    pub fn retry_temporary(mut self) -> Self
    where
        E: Temporary,
    {
        let previous = self.is_recoverable.take();
        self.is_recoverable = Some(Arc::new(move |err: &E| {
            if classify::is_temporary(err) {
                return true;
            }
            match &previous {
                Some(previous) => previous(err),
                None => classify::is_recoverable(err),
            }
        }));
        self
    }
}

/// Run `operation` until it succeeds or a terminal outcome is reached.
pub async fn execute<E, Fut, Op>(
    signal: &Signal,
    config: &RetryConfig<E>,
    operation: Op,
) -> Result<(), RetryError<E>>
where
    E: Error + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>>,
    Op: FnMut() -> Fut,
{
    execute_with_value(signal, config, operation).await
}

/// Run `operation` until it yields a value or a terminal outcome is reached.
pub async fn execute_with_value<T, E, Fut, Op>(
    signal: &Signal,
    config: &RetryConfig<E>,
    mut operation: Op,
) -> Result<T, RetryError<E>>
where
    E: Error + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>>,
    Op: FnMut() -> Fut,
{
    let backoff = config.backoff.as_ref().ok_or(ConfigError::MissingBackoff)?;
    let max_attempts = config.attempt_budget();

    let mut attempt: u32 = 0;
    let mut delay = backoff.min_delay();
    let mut last: Option<E> = None;

    loop {
        if let Some(reason) = signal.err() {
            tracing::debug!(attempt, %reason, "retry stopped before attempt");
            return Err(RetryError::cancelled(reason, last));
        }

        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let interrupted = signal
            .err()
            .or_else(|| classify::is_cancellation(&err).then_some(Cancellation::Cancelled));
        if let Some(reason) = interrupted {
            tracing::debug!(attempt, %reason, error = %err, "retry stopped after failed attempt");
            return Err(RetryError::cancelled(reason, Some(err)));
        }

        if !config.recoverable(&err) {
            tracing::debug!(attempt, error = %err, "error is not recoverable");
            return Err(RetryError::Rejected(err));
        }

        attempt += 1;
        if attempt >= max_attempts {
            tracing::debug!(attempts = attempt, error = %err, "retry attempts exhausted");
            return Err(RetryError::Exhausted { attempts: attempt, last: err });
        }

        if let Some(on_retry) = &config.on_retry {
            on_retry(attempt, &err, delay);
        }
        tracing::debug!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "scheduling retry"
        );
        last = Some(err);

        tokio::select! {
            biased;
            reason = signal.done() => {
                tracing::debug!(attempt, %reason, "retry stopped during backoff");
                return Err(RetryError::cancelled(reason, last));
            }
            _ = config.sleeper.sleep(delay) => {}
        }
        delay = backoff.next_delay(delay);
    }
}
