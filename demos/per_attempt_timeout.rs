//! Bounds each attempt at 200ms and the whole operation at 1s. The first attempt hangs and is
//! abandoned; the second answers in time.
//!
//! Run with `cargo run --example per_attempt_timeout`.
use backoff_retry::{Cancellation, RetrySettings, Signal};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
enum LookupError {
    #[error("lookup interrupted: {0}")]
    Interrupted(#[from] Cancellation),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let settings = RetrySettings { attempt_timeout_ms: Some(200), ..RetrySettings::default() };
    let config = settings.to_config::<LookupError>().with_logging();
    let signal = Signal::new().with_timeout(Duration::from_secs(1));

    let calls = AtomicU32::new(0);
    let result = settings.execute(&signal, &config, |attempt| {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n == 1 {
                // hangs until the attempt signal fires
                let reason = attempt.done().await;
                return Err(LookupError::from(reason));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok("10.0.0.7")
        }
    })
    .await;

    println!("resolved: {result:?} after {} attempts", calls.load(Ordering::SeqCst));
}
