//! Tower-native retry layer.
//!
//! Wraps a `tower_service::Service` so every call runs through [`execute_with_value`]. Requests
//! are cloned per attempt and the inner service is driven to readiness before each call.
//!
//! `RetryService` is always ready: readiness belongs to each attempt, so an inner `poll_ready`
//! error is an attempt failure and goes through the same classification as a call error.

use crate::error::RetryError;
use crate::retry::{execute_with_value, RetryConfig};
use crate::signal::Signal;
use futures::future::{poll_fn, BoxFuture};
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Applies a [`RetryConfig`] to every call of the wrapped service.
pub struct RetryLayer<E> {
    config: RetryConfig<E>,
    signal: Signal,
}

impl<E> RetryLayer<E> {
    /// Retry layer governed by a signal that never fires.
    pub fn new(config: RetryConfig<E>) -> Self {
        Self { config, signal: Signal::new() }
    }

    /// Calls made after `signal` fires fail with [`RetryError::Cancelled`].
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = signal;
        self
    }
}

impl<E> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self { config: self.config.clone(), signal: self.signal.clone() }
    }
}

impl<E> std::fmt::Debug for RetryLayer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryLayer")
            .field("config", &self.config)
            .field("signal", &self.signal)
            .finish()
    }
}

impl<S, E> Layer<S> for RetryLayer<E> {
    type Service = RetryService<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        RetryService { inner: service, layer: self.clone() }
    }
}

/// Retry service produced by `RetryLayer`.
pub struct RetryService<S, E> {
    inner: S,
    layer: RetryLayer<E>,
}

impl<S: Clone, E> Clone for RetryService<S, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), layer: self.layer.clone() }
    }
}

impl<S, E, Request> Service<Request> for RetryService<S, E>
where
    Request: Clone + Send + 'static,
    S: Service<Request> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<E>,
    S::Future: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Response = S::Response;
    type Error = RetryError<E>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let RetryLayer { config, signal } = self.layer.clone();
        let inner = self.inner.clone();
        Box::pin(async move {
            execute_with_value(&signal, &config, move || {
                let mut svc = inner.clone();
                let req = req.clone();
                async move {
                    poll_fn(|cx| svc.poll_ready(cx)).await.map_err(Into::<E>::into)?;
                    svc.call(req).await.map_err(Into::<E>::into)
                }
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::ExponentialBackoff;
    use crate::sleeper::InstantSleeper;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::{service_fn, ServiceBuilder, ServiceExt};

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    #[error("backend error: {0}")]
    struct BackendError(&'static str);

    fn config(max_attempts: u32) -> RetryConfig<BackendError> {
        let d = Duration::from_millis(1);
        RetryConfig::new(ExponentialBackoff::new(d, d, 1.0, 0.0))
            .max_attempts(max_attempts)
            .with_sleeper(InstantSleeper)
    }

    #[tokio::test]
    async fn retries_until_inner_service_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let svc = service_fn(move |req: &'static str| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(BackendError("busy"))
                } else {
                    Ok(format!("{} after {}", req, n))
                }
            }
        });

        let wrapped = ServiceBuilder::new().layer(RetryLayer::new(config(5))).service(svc);
        let response = wrapped.oneshot("ping").await.unwrap();

        assert_eq!(response, "ping after 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_as_retry_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let svc = service_fn(move |_req: ()| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(BackendError("down")) }
        });

        let err = RetryLayer::new(config(2)).layer(svc).oneshot(()).await.unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(err.last_error(), Some(&BackendError("down")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[derive(Clone)]
    struct FlakyReadiness {
        readiness_failures: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    impl Service<()> for FlakyReadiness {
        type Response = &'static str;
        type Error = BackendError;
        type Future = futures::future::Ready<Result<&'static str, BackendError>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), BackendError>> {
            let failed = self
                .readiness_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                Poll::Ready(Err(BackendError("not ready")))
            } else {
                Poll::Ready(Ok(()))
            }
        }

        fn call(&mut self, _req: ()) -> Self::Future {
            self.calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok("served"))
        }
    }

    #[tokio::test]
    async fn readiness_errors_are_retried_like_call_errors() {
        let svc = FlakyReadiness {
            readiness_failures: Arc::new(AtomicUsize::new(2)),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let calls = svc.calls.clone();

        let response = RetryLayer::new(config(3)).layer(svc).oneshot(()).await.unwrap();

        assert_eq!(response, "served");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn persistent_readiness_errors_exhaust() {
        let svc = FlakyReadiness {
            readiness_failures: Arc::new(AtomicUsize::new(usize::MAX)),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let calls = svc.calls.clone();

        let err = RetryLayer::new(config(2)).layer(svc).oneshot(()).await.unwrap_err();

        assert!(err.is_exhausted());
        assert!(!err.is_rejected());
        assert_eq!(err.last_error(), Some(&BackendError("not ready")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_layer_never_calls_inner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let svc = service_fn(move |_req: ()| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, BackendError>(()) }
        });
        let signal = Signal::new();
        signal.cancel();

        let err = RetryLayer::new(config(3))
            .with_signal(signal)
            .layer(svc)
            .oneshot(())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
