//! Retries a flaky call with logging, then shows a Ctrl-C style cancellation cutting a long
//! backoff short.
//!
//! Run with `cargo run --example retry_with_cancel`.
use backoff_retry::{execute, execute_with_value, ExponentialBackoff, RetryConfig, Signal};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("upstream returned 503")]
struct Upstream503;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let config = RetryConfig::new(ExponentialBackoff::new(
        Duration::from_millis(50),
        Duration::from_millis(400),
        2.0,
        0.2,
    ))
    .max_attempts(5)
    .with_logging();

    let calls = AtomicU32::new(0);
    let body = execute_with_value(&Signal::new(), &config, || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 3 {
                Err(Upstream503)
            } else {
                Ok(format!("payload from attempt {n}"))
            }
        }
    })
    .await;
    println!("first call: {body:?}");

    let signal = Signal::new();
    let canceller = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        println!("cancelling");
        canceller.cancel();
    });

    let slow = config.clone().backoff(ExponentialBackoff::new(
        Duration::from_secs(2),
        Duration::from_secs(30),
        2.0,
        0.0,
    ));
    match execute(&signal, &slow, || async { Err(Upstream503) }).await {
        Ok(()) => println!("second call unexpectedly succeeded"),
        Err(err) => println!("second call: {err}"),
    }
}
