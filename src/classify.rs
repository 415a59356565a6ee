//! Error classification: which failures are worth another attempt.
//!
//! Two independent markers:
//! - **Unrecoverable**: wrap any error with [`mark_unrecoverable`]; [`is_unrecoverable`] finds the
//!   marker anywhere in the `source()` chain, so further wrapping does not hide it.
//! - **Temporary**: error types may implement [`Temporary`]; [`is_temporary`] reports it.
//!
//! [`is_recoverable`] is the rule the retry loop applies when no predicate is configured: retry
//! everything except cancellations and errors marked unrecoverable.

use crate::signal::Cancellation;
use std::error::Error;
use std::io;

/// Boxed error used as the cause of an [`Unrecoverable`].
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Marks its cause as never worth retrying.
#[derive(Debug, thiserror::Error)]
#[error("unrecoverable: {cause}")]
pub struct Unrecoverable {
    #[source]
    cause: BoxError,
}

impl Unrecoverable {
    pub fn new(cause: impl Into<BoxError>) -> Self {
        Self { cause: cause.into() }
    }

    /// `None` in, `None` out.
    pub fn wrap<E>(cause: Option<E>) -> Option<Self>
    where
        E: Into<BoxError>,
    {
        cause.map(Self::new)
    }

    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.cause
    }

    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

/// Wrap `err` so the retry loop stops on it immediately.
pub fn mark_unrecoverable(err: impl Into<BoxError>) -> Unrecoverable {
    Unrecoverable::new(err)
}

/// Walk `err` and its `source()` chain looking for a `T`.
pub fn find_cause<'a, T>(err: &'a (dyn Error + 'static)) -> Option<&'a T>
where
    T: Error + 'static,
{
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        current = e.source();
    }
    None
}

/// True if any error in the chain was produced by [`mark_unrecoverable`].
pub fn is_unrecoverable(err: &(dyn Error + 'static)) -> bool {
    find_cause::<Unrecoverable>(err).is_some()
}

/// True if the chain carries an explicit [`Cancellation::Cancelled`].
///
/// [`Cancellation::DeadlineExceeded`] is not included: an expired per-attempt deadline is an
/// ordinary failure of that attempt.
pub fn is_cancellation(err: &(dyn Error + 'static)) -> bool {
    matches!(find_cause::<Cancellation>(err), Some(Cancellation::Cancelled))
}

/// Default recoverability rule.
pub fn is_recoverable(err: &(dyn Error + 'static)) -> bool {
    !is_cancellation(err) && !is_unrecoverable(err)
}

/// Optional capability: errors that know whether they are transient.
///
/// The provided method answers `false`, so an empty impl declares "no opinion".
pub trait Temporary {
    fn is_temporary(&self) -> bool {
        false
    }
}

/// Ask `err` whether it is transient.
pub fn is_temporary<E>(err: &E) -> bool
where
    E: Temporary + ?Sized,
{
    err.is_temporary()
}

impl Temporary for io::Error {
    fn is_temporary(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::TimedOut
                | io::ErrorKind::Interrupted
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
        )
    }
}

impl Temporary for Cancellation {
    fn is_temporary(&self) -> bool {
        matches!(self, Cancellation::DeadlineExceeded)
    }
}

impl Temporary for Unrecoverable {}
