use backoff_retry::{
    execute, execute_with_value, find_cause, is_unrecoverable, mark_unrecoverable, Cancellation,
    ExponentialBackoff, RetryConfig, RetryError, Signal, Temporary, TrackingSleeper, Unrecoverable,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("service unavailable")]
    Unavailable,
    #[error("rate limited")]
    RateLimited,
    #[error("bad request")]
    BadRequest(#[source] Unrecoverable),
    #[error("request aborted")]
    Aborted(#[from] Cancellation),
}

impl Temporary for ApiError {
    fn is_temporary(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

fn fixed(delay_ms: u64, max_attempts: u32) -> RetryConfig<ApiError> {
    let d = Duration::from_millis(delay_ms);
    RetryConfig::new(ExponentialBackoff::new(d, d, 1.0, 0.0)).max_attempts(max_attempts)
}

#[tokio::test]
async fn succeeds_first_try_without_waiting() {
    let sleeper = TrackingSleeper::new();
    let calls = AtomicU32::new(0);

    let result = execute(&Signal::new(), &fixed(10, 3).with_sleeper(sleeper.clone()), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sleeper.calls(), 0);
}

#[tokio::test]
async fn recovers_after_transient_failures() {
    let sleeper = TrackingSleeper::new();
    let calls = AtomicU32::new(0);

    let value = execute_with_value(
        &Signal::new(),
        &fixed(10, 5).with_sleeper(sleeper.clone()),
        || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(ApiError::Unavailable)
                } else {
                    Ok(n)
                }
            }
        },
    )
    .await
    .unwrap();

    assert_eq!(value, 3);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(10); 2]);
}

#[tokio::test]
async fn exhaustion_wraps_last_error() {
    let calls = AtomicU32::new(0);

    let err = execute(&Signal::new(), &fixed(1, 3).with_sleeper(TrackingSleeper::new()), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(ApiError::Unavailable) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(err.attempts(), Some(3));
    assert!(matches!(err.last_error(), Some(ApiError::Unavailable)));
    assert!(err.to_string().contains("all retry attempts failed"));
    assert!(err.to_string().contains("service unavailable"));
    assert!(find_cause::<RetryError<ApiError>>(&err).is_some_and(RetryError::is_exhausted));
}

#[tokio::test]
async fn unrecoverable_error_stops_immediately() {
    let sleeper = TrackingSleeper::new();
    let calls = AtomicU32::new(0);

    let err = execute(&Signal::new(), &fixed(1, 5).with_sleeper(sleeper.clone()), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(ApiError::BadRequest(mark_unrecoverable("missing field `id`"))) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sleeper.calls(), 0);
    assert!(err.is_rejected());
    assert!(is_unrecoverable(&err));
    assert!(!err.is_exhausted());
}

#[tokio::test]
async fn custom_predicate_overrides_default_rule() {
    let calls = AtomicU32::new(0);
    let config = fixed(1, 5)
        .with_sleeper(TrackingSleeper::new())
        .is_recoverable(|err: &ApiError| !matches!(err, ApiError::Unavailable));

    let err = execute(&Signal::new(), &config, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(ApiError::Unavailable) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(err, RetryError::Rejected(ApiError::Unavailable)));
}

#[tokio::test]
async fn temporary_errors_retry_when_opted_in() {
    let calls = AtomicU32::new(0);
    let config = fixed(1, 4)
        .with_sleeper(TrackingSleeper::new())
        .is_recoverable(|_: &ApiError| false)
        .retry_temporary();

    let err = execute(&Signal::new(), &config, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(ApiError::RateLimited) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(err.is_exhausted());
}

#[tokio::test(start_paused = true)]
async fn cancel_during_wait_stops_retrying() {
    let signal = Signal::new();
    let canceller = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });
    let calls = AtomicU32::new(0);
    let start = tokio::time::Instant::now();

    let err = execute(&signal, &fixed(1_000, 5), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(ApiError::Unavailable) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_millis(1_000));
    assert_eq!(err.cancellation(), Some(Cancellation::Cancelled));
    assert!(matches!(err.last_error(), Some(ApiError::Unavailable)));
}

#[tokio::test]
async fn already_cancelled_signal_never_runs_operation() {
    let signal = Signal::new();
    signal.cancel();
    let calls = AtomicU32::new(0);

    let err = execute(&signal, &fixed(1, 3), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(err.is_cancelled());
    assert!(err.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_total_time() {
    let signal = Signal::new().with_timeout(Duration::from_millis(250));
    let calls = AtomicU32::new(0);

    let err = execute(&signal, &fixed(100, 100), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(ApiError::Unavailable) }
    })
    .await
    .unwrap_err();

    assert_eq!(err.cancellation(), Some(Cancellation::DeadlineExceeded));
    // attempts at 0, 100 and 200ms; the third wait is cut short at 250ms
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn cancellation_in_error_chain_is_terminal() {
    let calls = AtomicU32::new(0);
    let err = execute(&Signal::new(), &fixed(1, 5).with_sleeper(TrackingSleeper::new()), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(ApiError::Aborted(Cancellation::Cancelled)) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.cancellation(), Some(Cancellation::Cancelled));
}

#[tokio::test]
async fn deadline_in_error_chain_is_retried_while_signal_is_live() {
    let calls = AtomicU32::new(0);
    let err = execute(&Signal::new(), &fixed(1, 3).with_sleeper(TrackingSleeper::new()), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(ApiError::Aborted(Cancellation::DeadlineExceeded)) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(err.is_exhausted());
}

#[tokio::test]
async fn on_retry_sees_each_scheduled_retry() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let backoff = ExponentialBackoff::new(
        Duration::from_millis(10),
        Duration::from_millis(35),
        2.0,
        0.0,
    );
    let config = RetryConfig::new(backoff)
        .max_attempts(4)
        .with_sleeper(TrackingSleeper::new())
        .on_retry(move |attempt, err: &ApiError, delay| {
            record.lock().unwrap().push((attempt, err.to_string(), delay));
        });

    let _ = execute(&Signal::new(), &config, || async { Err(ApiError::Unavailable) }).await;

    let seen = seen.lock().unwrap();
    let expected: Vec<(u32, String, Duration)> = vec![
        (1, "service unavailable".into(), Duration::from_millis(10)),
        (2, "service unavailable".into(), Duration::from_millis(20)),
        (3, "service unavailable".into(), Duration::from_millis(35)),
    ];
    assert_eq!(*seen, expected);
}

#[tokio::test]
async fn missing_backoff_is_a_config_error() {
    let calls = AtomicU32::new(0);
    let err = execute(&Signal::new(), &RetryConfig::<ApiError>::default(), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    })
    .await
    .unwrap_err();

    assert!(err.is_config());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
