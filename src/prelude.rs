//! Convenient re-exports for common retry types.
pub use crate::{
    backoff::{Backoff, ExponentialBackoff},
    classify::{is_temporary, is_unrecoverable, mark_unrecoverable, Temporary, Unrecoverable},
    error::{ConfigError, RetryError},
    layer::RetryLayer,
    retry::{execute, execute_with_value, RetryConfig},
    settings::RetrySettings,
    signal::{Cancellation, Signal},
    timeout::execute_with_timeout,
};
