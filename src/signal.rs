//! Governing cancellation signal for a retry sequence.
//!
//! A [`Signal`] pairs a [`CancellationToken`] with an optional deadline. The retry loop checks it
//! before every attempt, after every failure, and races it against every inter-attempt wait.
//!
//! Child signals (see [`Signal::child_with_timeout`]) inherit the parent's token and deadline, so
//! cancelling or expiring the parent also ends every child, while a child's own timeout leaves
//! the parent untouched.

use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Instant, Sleep};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Why a signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Cancellation {
    /// The token was cancelled.
    #[error("operation cancelled")]
    Cancelled,
    /// The deadline elapsed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token plus optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Signal {
    /// A signal that fires only when [`Signal::cancel`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one owned by a supervisor.
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    /// Add a deadline. An earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Add a deadline `timeout` from now. Timeouts too large to represent are ignored.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Derived signal: fires when this one does, and can be cancelled on its own.
    pub fn child(&self) -> Self {
        Self { token: self.token.child_token(), deadline: self.deadline }
    }

    /// Derived signal that additionally expires after `timeout`.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.child().with_timeout(timeout)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Reason the signal has fired, or `None` while it is live.
    pub fn err(&self) -> Option<Cancellation> {
        if self.token.is_cancelled() {
            return Some(Cancellation::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Cancellation::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the signal fires. Dropping the future releases its timer.
    pub fn done(&self) -> Done<'_> {
        Done {
            cancelled: self.token.cancelled(),
            deadline: self.deadline.map(tokio::time::sleep_until),
        }
    }
}

/// Future returned by [`Signal::done`].
#[pin_project]
#[must_use = "futures do nothing unless polled"]
pub struct Done<'a> {
    #[pin]
    cancelled: WaitForCancellationFuture<'a>,
    #[pin]
    deadline: Option<Sleep>,
}

impl Future for Done<'_> {
    type Output = Cancellation;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if this.cancelled.poll(cx).is_ready() {
            return Poll::Ready(Cancellation::Cancelled);
        }
        if let Some(sleep) = this.deadline.as_pin_mut() {
            if sleep.poll(cx).is_ready() {
                return Poll::Ready(Cancellation::DeadlineExceeded);
            }
        }
        Poll::Pending
    }
}
