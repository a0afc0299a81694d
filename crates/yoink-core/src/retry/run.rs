//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs a closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, delay_ms = d.as_millis() as u64, "retrying fetch: {}", e);
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn returns_value_on_first_success() {
        let p = RetryPolicy::default();
        let r: Result<u32, FetchError> = run_with_retry(&p, || Ok(7));
        assert_eq!(r.unwrap(), 7);
    }

    #[test]
    fn retries_until_success() {
        let p = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let mut calls = 0;
        let r: Result<u32, FetchError> = run_with_retry(&p, || {
            calls += 1;
            if calls < 3 {
                Err(FetchError::Http(503))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(r.unwrap(), 3);
    }

    #[test]
    fn gives_up_on_non_retryable() {
        let p = RetryPolicy::default();
        let mut calls = 0;
        let r: Result<(), FetchError> = run_with_retry(&p, || {
            calls += 1;
            Err(FetchError::Http(404))
        });
        assert!(matches!(r, Err(FetchError::Http(404))));
        assert_eq!(calls, 1);
    }
}
