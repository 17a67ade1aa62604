use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Bounded retry with exponential backoff and jitter, shared by the
/// gateway's fan-out to nodes and documented for external clients of the
/// gateway. `is_retryable` classifies an error; the final attempt's error
/// (retryable or not) is always returned if all attempts are exhausted.
pub async fn retry<F, Fut, T, E>(
    attempts: u32,
    base_delay: Duration,
    jitter: Duration,
    is_retryable: impl Fn(&E) -> bool,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let backoff = base_delay.saturating_mul(1 << (attempt - 1));
                let jitter_ms = if jitter.is_zero() {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=jitter.as_millis() as u64)
                };
                tokio::time::sleep(backoff + Duration::from_millis(jitter_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(3, Duration::from_millis(1), Duration::ZERO, |_| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_the_attempt_budget_then_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(4, Duration::from_millis(1), Duration::ZERO, |_| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("503") }
        })
        .await;
        assert_eq!(result, Err("503"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(3, Duration::from_millis(1), Duration::ZERO, |_| false, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("400") }
        })
        .await;
        assert_eq!(result, Err("400"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_after_a_transient_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(3, Duration::from_millis(1), Duration::ZERO, |_| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n == 0 { Err("503") } else { Ok(7) } }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
