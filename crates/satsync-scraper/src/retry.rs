//! Linear-backoff retry for transient fetch failures.
//!
//! [`retry_linear`] wraps a fallible async operation and retries on rate
//! limiting (HTTP 429) and network-level errors. Other failures — bad
//! statuses, selector errors — are returned immediately; the search layer
//! decides whether to try an alternate query instead.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable:
/// - [`ScraperError::RateLimited`] — HTTP 429; the server asked us to slow down.
/// - [`ScraperError::Http`] — network-level failure (timeout, connection reset).
///
/// Not retriable (propagated immediately):
/// - [`ScraperError::UnexpectedStatus`] — the page is there and answering; a
///   different query, not a retry, is the correct follow-up.
/// - [`ScraperError::InvalidBaseUrl`] / [`ScraperError::Selector`] —
///   configuration problems; retrying cannot fix them.
fn is_retriable(err: &ScraperError) -> bool {
    matches!(
        err,
        ScraperError::RateLimited { .. } | ScraperError::Http(_)
    )
}

/// Executes `operation` with linear backoff on transient errors.
///
/// The wait before the n-th retry (1-based) is `n * unit` seconds, where
/// `unit` is [`rate_limit_unit_secs`] for 429s and [`network_unit_secs`] for
/// network errors. At most `max_retries` additional attempts are made after
/// the first try; exhausting them returns the last error.
///
/// | Retry | 429 sleep (unit=5) | network sleep (unit=2) |
/// |-------|--------------------|------------------------|
/// | 1     | 5 s                | 2 s                    |
/// | 2     | 10 s               | 4 s                    |
/// | 3     | 15 s               | 6 s                    |
pub(crate) async fn retry_linear<T, F, Fut>(
    max_retries: u32,
    rate_limit_unit_secs: u64,
    network_unit_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let unit = match err {
                    ScraperError::RateLimited { .. } => rate_limit_unit_secs,
                    _ => network_unit_secs,
                };
                let delay_secs = unit.saturating_mul(u64::from(attempt));
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_secs,
                    error = %err,
                    "transient fetch error — retrying after backoff"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn rate_limited() -> ScraperError {
        ScraperError::RateLimited {
            url: "https://example.com/catalog/".to_owned(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_linear(3, 0, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ScraperError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_rate_limited_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_linear(3, 0, 0, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(rate_limited())
                } else {
                    Ok::<u32, ScraperError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_last_error_after_exhausting_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_linear(2, 0, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(rate_limited())
            }
        })
        .await;
        // max_retries=2 → 3 total attempts
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(ScraperError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_unexpected_status() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_linear(3, 0, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(ScraperError::UnexpectedStatus {
                    status: 503,
                    url: "https://example.com/catalog/".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ScraperError::UnexpectedStatus { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_selector_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_linear(3, 0, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(ScraperError::Selector {
                    selector: "div..broken".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ScraperError::Selector { .. })));
    }
}
