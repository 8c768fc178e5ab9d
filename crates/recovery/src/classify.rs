use std::time::Duration;

use ab_domain::{config::RetryConfig, Error};

/// Outcome of consulting the retry policy for a classified error at a
/// given attempt count (spec §4.7).
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// Try again after `delay`, as attempt number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// Retryable, but `max_retries` has already been spent.
    Exhausted,
    /// Not a transport error — surface as a failed run immediately.
    NonRetryable,
}

/// Decides what to do with `error` observed on `attempt` (0-indexed,
/// i.e. `attempt = 0` is the first failure). `retry_after` overrides the
/// computed backoff when the provider supplied one.
pub fn next_retry(policy: &RetryConfig, error: &Error, attempt: u32, retry_after: Option<Duration>) -> RetryOutcome {
    if !error.is_retryable() {
        return RetryOutcome::NonRetryable;
    }
    if attempt >= policy.max_retries {
        return RetryOutcome::Exhausted;
    }
    let delay = retry_after.unwrap_or_else(|| backoff_delay(policy, attempt));
    RetryOutcome::Retry { attempt: attempt + 1, delay }
}

/// `backoff = initial * base^attempt * (1 + jitter)`, clamped to
/// `max_backoff_ms` (spec §4.7).
fn backoff_delay(policy: &RetryConfig, attempt: u32) -> Duration {
    let raw = policy.initial_backoff_ms as f64 * policy.base.powi(attempt as i32);
    let with_jitter = raw * (1.0 + policy.jitter);
    let capped = with_jitter.min(policy.max_backoff_ms as f64).max(0.0);
    Duration::from_millis(capped as u64)
}
