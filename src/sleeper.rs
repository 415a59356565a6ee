//! Abstraction for the inter-attempt wait
//!
//! The retry loop races the sleeper against its [`Signal`](crate::Signal), so any implementation
//! is cancellable for free. Tests swap in [`InstantSleeper`] or [`TrackingSleeper`] to avoid
//! real delays.

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Abstraction for sleeping/waiting
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Production sleeper using the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Completes immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

/// Records every requested delay and completes immediately. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Duration>> {
        self.delays.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.lock().push(duration);
        Box::pin(async {})
    }
}
