#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # backoff-retry
//!
//! Retry engine for async Rust: re-invokes a fallible operation with exponential backoff until
//! it succeeds, runs out of attempts, hits a non-retryable error, or is cancelled.
//!
//! ## Features
//!
//! - **Exponential backoff** with proportional jitter and hard `[min, max]` bounds
//! - **Error classification**: unrecoverable markers found through any wrapping, optional
//!   temporary-error capability, pluggable predicates
//! - **Cancellation** via [`Signal`] (token + deadline), honoured before, after, and between
//!   attempts
//! - **Per-attempt timeouts** nested inside the overall signal
//! - **Tower layer** for wrapping services
//!
//! ## Quick Start
//!
//! ```rust
//! use backoff_retry::{execute, mark_unrecoverable, ExponentialBackoff, RetryConfig, Signal};
//!
//! #[derive(Debug, thiserror::Error)]
//! enum StoreError {
//!     #[error("store unavailable")]
//!     Unavailable,
//!     #[error("rejected")]
//!     Rejected(#[source] backoff_retry::Unrecoverable),
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RetryConfig::new(ExponentialBackoff::standard())
//!         .max_attempts(5)
//!         .with_logging();
//!
//!     let result = execute(&Signal::new(), &config, || async {
//!         // Your async operation here
//!         Err::<(), _>(StoreError::Rejected(mark_unrecoverable("quota exceeded")))
//!     })
//!     .await;
//!
//!     let err = result.unwrap_err();
//!     assert!(err.is_rejected());
//!     assert!(backoff_retry::is_unrecoverable(&err));
//! #   let _ = StoreError::Unavailable;
//! }
//! ```

pub mod backoff;
pub mod classify;
pub mod error;
pub mod jitter;
pub mod layer;
pub mod prelude;
pub mod retry;
pub mod settings;
pub mod signal;
pub mod sleeper;
pub mod timeout;

// Re-exports
pub use backoff::{Backoff, ExponentialBackoff};
pub use classify::{
    find_cause, is_recoverable, is_temporary, is_unrecoverable, mark_unrecoverable, BoxError,
    Temporary, Unrecoverable,
};
pub use error::{ConfigError, RetryError};
pub use layer::{RetryLayer, RetryService};
pub use retry::{execute, execute_with_value, RetryConfig};
pub use settings::{BackoffSettings, RetrySettings};
pub use signal::{Cancellation, Signal};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use timeout::execute_with_timeout;
