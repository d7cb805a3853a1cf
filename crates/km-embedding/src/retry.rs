//! Retry/backoff for transient embedding-provider failures (spec.md §4.8:
//! "at least three attempts with doubling delays").

use std::future::Future;
use std::time::Duration;

const RETRY_DELAYS_MS: [u64; 3] = [200, 400, 800];

/// Calls `attempt` until it succeeds or `RETRY_DELAYS_MS` is exhausted,
/// sleeping between failures. Four attempts total. Returns the last
/// error if every attempt fails.
pub async fn with_retry<T, E, F, Fut>(mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_err = match attempt().await {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };
    for delay_ms in RETRY_DELAYS_MS {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        match attempt().await {
            Ok(v) => return Ok(v),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_works() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, &str> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, &str> = with_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err("not yet") } else { Ok(42) } }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_exhausting_all_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, &str> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down") }
        })
        .await;
        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
