//! Bounded retry with linear backoff shared by the networked sinks.

use async_trait::async_trait;
use breadcrumbs_config::RetryPolicy;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

/// Suspends between attempts. Tests inject a recording implementation.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        tokio::time::sleep(duration).await;
    }
}

/// A classified failure that knows whether another attempt may succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Whether a failed 1-indexed `attempt` out of `total` should be retried.
pub fn should_retry<E: Retryable>(attempt: u32, total: u32, err: &E) -> bool {
    attempt < total && err.is_retryable()
}

/// Run `attempt_fn` until it succeeds, fails terminally, or the policy's
/// attempts run out. The closure receives the 1-indexed attempt number.
///
/// Attempts are strictly sequential. The last classified error is
/// returned unchanged.
pub async fn deliver_with_retry<T, E, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    mut attempt_fn: F,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total = policy.total_attempts();
    let mut attempt = 1;
    loop {
        let err = match attempt_fn(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{label} delivered after retry (attempt={attempt})");
                }
                return Ok(value);
            }
            Err(err) => err,
        };
        if !should_retry(attempt, total, &err) {
            warn!("{label} delivery failed (attempt={attempt}, total={total}, error={err})");
            return Err(err);
        }
        let delay = policy.backoff_for(attempt);
        warn!(
            "{label} attempt failed, retrying (attempt={attempt}, delay_ms={}, error={err})",
            delay.as_millis()
        );
        sleeper.sleep(delay).await;
        attempt += 1;
    }
}
