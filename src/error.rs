//! Terminal outcomes of a failed retry sequence.
use crate::signal::Cancellation;
use std::fmt;

/// Configuration problems reported before any attempt runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("backoff strategy is required")]
    MissingBackoff,
    #[error("attempt timeout must be greater than zero")]
    ZeroTimeout,
}

/// Why a retry sequence ended without a value.
///
/// Each variant calls for a different remediation, and `source()` is wired so the distinction
/// survives further wrapping:
/// - `Cancelled` → the [`Cancellation`] reason;
/// - `Rejected` / `Exhausted` → the operation's error;
///
/// `Rejected` keeps its own message out of `Display` so chain reporters print the operation's
/// error once, via `source()`.
/// - `Config` → the [`ConfigError`].
#[derive(Debug)]
pub enum RetryError<E> {
    /// The configuration was unusable; the operation never ran.
    Config(ConfigError),
    /// The governing signal fired before, between, or during an attempt.
    Cancelled { reason: Cancellation, last: Option<E> },
    /// The error was classified as not worth retrying; it is returned unchanged.
    Rejected(E),
    /// Every allowed attempt failed with a recoverable error.
    Exhausted { attempts: u32, last: E },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid retry configuration: {}", e),
            Self::Cancelled { reason, last: Some(last) } => {
                write!(f, "retry stopped: {}; last error: {}", reason, last)
            }
            Self::Cancelled { reason, last: None } => write!(f, "retry stopped: {}", reason),
            Self::Rejected(_) => write!(f, "operation failed with a non-retryable error"),
            Self::Exhausted { attempts, last } => {
                write!(f, "all retry attempts failed ({} attempts); last error: {}", attempts, last)
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Cancelled { reason, .. } => Some(reason),
            Self::Rejected(e) => Some(e),
            Self::Exhausted { last, .. } => Some(last),
        }
    }
}

impl<E> From<ConfigError> for RetryError<E> {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl<E> RetryError<E> {
    pub(crate) fn cancelled(reason: Cancellation, last: Option<E>) -> Self {
        Self::Cancelled { reason, last }
    }

    /// Check if every attempt was used up.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Check if the governing signal ended the sequence.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Check if the operation's error was classified as non-retryable.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Cancellation reason, if the signal fired.
    pub fn cancellation(&self) -> Option<Cancellation> {
        match self {
            Self::Cancelled { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Attempts consumed, for exhaustion.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Borrow the most recent operation error, if one was observed.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Config(_) => None,
            Self::Cancelled { last, .. } => last.as_ref(),
            Self::Rejected(e) | Self::Exhausted { last: e, .. } => Some(e),
        }
    }

    /// Take the most recent operation error, if one was observed.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Config(_) => None,
            Self::Cancelled { last, .. } => last,
            Self::Rejected(e) | Self::Exhausted { last: e, .. } => Some(e),
        }
    }
}
