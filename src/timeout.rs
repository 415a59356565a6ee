//! Per-attempt timeout on top of the retry executor.
//!
//! Each attempt receives a child of the governing [`Signal`] that also expires after the attempt
//! timeout. An attempt that overruns fails with `E::from(Cancellation::DeadlineExceeded)` and is
//! classified like any other failure, so it is retried unless the outer signal has fired too.

use crate::error::{ConfigError, RetryError};
use crate::retry::{execute_with_value, RetryConfig};
use crate::signal::{Cancellation, Signal};
use std::error::Error;
use std::future::Future;
use std::time::Duration;

/// Like [`execute_with_value`], bounding every attempt by `timeout`.
///
/// `operation` gets the attempt's signal so it can stop cooperative work early; attempts that
/// ignore it are dropped when the signal fires. A zero `timeout` is rejected before any attempt.
pub async fn execute_with_timeout<T, E, Fut, Op>(
    signal: &Signal,
    config: &RetryConfig<E>,
    timeout: Duration,
    mut operation: Op,
) -> Result<T, RetryError<E>>
where
    E: Error + From<Cancellation> + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>>,
    Op: FnMut(Signal) -> Fut,
{
    if timeout.is_zero() {
        return Err(ConfigError::ZeroTimeout.into());
    }

    execute_with_value(signal, config, || {
        let attempt = signal.child_with_timeout(timeout);
        let work = operation(attempt.clone());
        async move {
            tokio::select! {
                biased;
                result = work => result,
                reason = attempt.done() => Err(E::from(reason)),
            }
        }
    })
    .await
}
