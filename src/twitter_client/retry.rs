use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::cmp::min;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How remote calls wait out rate limits and transient failures.
///
/// Rate-limit responses are always waited out (until the reported reset, or
/// [RetryPolicy::rate_limit_wait_ms] when the API doesn't say). `max_rate_limit_waits`
/// bounds that only when set. Transient failures (5xx, dropped connections) back off
/// exponentially and give up after `max_attempts`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub rate_limit_wait_ms: u64,
    pub max_rate_limit_waits: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            rate_limit_wait_ms: 15 * 60 * 1_000,
            max_rate_limit_waits: None,
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds or fails in a way this policy won't absorb.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut delay = Duration::from_millis(self.initial_delay_ms);
        let mut transient_failures = 0;
        let mut rate_limit_waits = 0;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let wait = if err.is_rate_limited() {
                rate_limit_waits += 1;
                if matches!(self.max_rate_limit_waits, Some(max) if rate_limit_waits > max) {
                    return Err(err);
                }
                err.retry_after()
                    .unwrap_or(Duration::from_millis(self.rate_limit_wait_ms))
            } else if err.is_retryable() {
                transient_failures += 1;
                if transient_failures >= self.max_attempts {
                    return Err(err);
                }
                let wait = delay;
                delay = min(delay * 2, Duration::from_millis(self.max_delay_ms));
                wait
            } else {
                return Err(err);
            };

            warn!(
                label,
                error = %err,
                wait_secs = wait.as_secs_f64(),
                rate_limit_waits,
                transient_failures,
                "waiting before retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }
}
