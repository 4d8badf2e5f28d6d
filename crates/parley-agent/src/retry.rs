//! Bounded fixed-delay retry.

use std::future::Future;

use crate::config::RetryPolicy;

/// Runs `attempt` until it succeeds or the policy's attempt budget is
/// exhausted, sleeping the warm-up delay first and the fixed delay between
/// attempts. On exhaustion the last failure is returned.
///
/// The closure receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);

    if !policy.warmup().is_zero() {
        tokio::time::sleep(policy.warmup()).await;
    }

    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(e) if n < attempts => {
                tracing::warn!(attempt = n, total = attempts, error = %e, "attempt failed, retrying");
                n += 1;
                tokio::time::sleep(policy.delay()).await;
            }
            Err(e) => {
                tracing::warn!(attempt = n, total = attempts, error = %e, "attempt failed, giving up");
                return Err(e);
            }
        }
    }
}
