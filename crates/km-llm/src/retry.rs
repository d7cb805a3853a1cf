//! Retry/backoff for transient extraction-provider failures (spec.md
//! §4.8: "at least three attempts with doubling delays").

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
