// Retry controller tests (paused tokio clock)
// Author: kelexine (https://github.com/kelexine)

use eventforge::error::EventForgeError;
use eventforge::provider::{ProviderError, ProviderErrorKind};
use eventforge::utils::retry::{RetryController, RetryPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn policy(base_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(base_ms),
        max_delay: Duration::from_secs(30),
        jitter_ratio: 0.3,
    }
}

#[tokio::test(start_paused = true)]
async fn test_three_attempts_with_backoff_floor() {
    let controller = RetryController::new(policy(100));
    let cancel = CancellationToken::new();
    let calls = AtomicU32::new(0);
    let started = Instant::now();

    let failure = controller
        .execute("always_rate_limited", &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ProviderError::new(ProviderErrorKind::RateLimited, "429")) }
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(failure.attempts, 3);
    match failure.error {
        EventForgeError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.kind, ProviderErrorKind::RateLimited);
        }
        other => panic!("unexpected error: {}", other),
    }

    // base + 2×base, jitter only ever adds
    let floor = Duration::from_millis(100 + 200);
    assert!(started.elapsed() >= floor);
    assert!(failure.waited >= floor);
    assert!(failure.waited <= floor.mul_f64(1.3));
}

#[tokio::test(start_paused = true)]
async fn test_terminal_error_is_not_retried() {
    let controller = RetryController::new(policy(100));
    let cancel = CancellationToken::new();
    let calls = AtomicU32::new(0);

    let failure = controller
        .execute("bad_request", &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ProviderError::new(ProviderErrorKind::InvalidRequest, "400")) }
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(failure.waited, Duration::ZERO);
    assert!(matches!(failure.error, EventForgeError::TerminalProvider(_)));
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_failure() {
    let controller = RetryController::new(policy(50));
    let cancel = CancellationToken::new();
    let calls = AtomicU32::new(0);

    let outcome = controller
        .execute("flaky", &cancel, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(ProviderError::new(ProviderErrorKind::ServerError, "503"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(outcome.value, 1);
    assert_eq!(outcome.attempts, 2);
    assert!(outcome.waited >= Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_abandons_wait() {
    let controller = RetryController::new(policy(10_000));
    let cancel = CancellationToken::new();
    let calls = Arc::new(AtomicU32::new(0));

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let counter = Arc::clone(&calls);
    let failure = controller
        .execute("cancelled", &cancel, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ProviderError::new(ProviderErrorKind::Timeout, "slow")) }
        })
        .await
        .unwrap_err();

    assert!(matches!(failure.error, EventForgeError::Cancelled { attempts: 1 }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_retry_hint_is_capped() {
    let controller = RetryController::new(RetryPolicy {
        max_delay: Duration::from_secs(5),
        jitter_ratio: 0.0,
        ..policy(100)
    });
    let cancel = CancellationToken::new();
    let calls = AtomicU32::new(0);

    let outcome = controller
        .execute("hinted", &cancel, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(ProviderError::new(ProviderErrorKind::RateLimited, "429")
                        .with_retry_after(Some(Duration::from_secs(120))))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(outcome.waited, Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_short_retry_hint_keeps_backoff_floor() {
    let controller = RetryController::new(RetryPolicy {
        jitter_ratio: 0.0,
        ..policy(500)
    });
    let cancel = CancellationToken::new();
    let calls = AtomicU32::new(0);

    let outcome = controller
        .execute("hinted", &cancel, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(ProviderError::new(ProviderErrorKind::RateLimited, "429")
                        .with_retry_after(Some(Duration::from_millis(20))))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(outcome.attempts, 3);
    // 500ms then 1s: the second wait still doubles after a hinted first one
    assert_eq!(outcome.waited, Duration::from_millis(1500));
}
