//! Retry policy for provider calls.
//!
//! Every stage of turn generation talks to a remote provider that can fail
//! transiently. `RetryPolicy` describes how many times a stage is attempted and
//! how long to wait between attempts; [`RetryPolicy::run`] drives an async
//! operation under that policy.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// Exponential backoff policy applied to a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    /// Default: 3
    pub max_attempts: u32,

    /// Delay after the first failed attempt.
    /// Default: 4s
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,

    /// Upper bound for any single delay.
    /// Default: 10s
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after every failed attempt.
    /// Default: 2.0
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
        }
    }
}

/// Returned when every attempt of an operation failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Number of attempts that were made.
    pub attempts: u32,
    /// Error produced by the final attempt.
    pub last_error: E,
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// `base_delay * backoff_factor^(attempt-1)`, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let delay = base * self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Whether another attempt is allowed after `attempt` attempts were made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// `stage` only labels the log lines.
    pub async fn run<T, E, F, Fut>(&self, stage: &str, mut operation: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        stage,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Stage attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(stage, attempt, error = %e, "Stage failed, no attempts left");
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
            }
        }
    }
}

/// Serde helper so config files can write delays as milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(4));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert_eq!(policy.backoff_factor, 2.0);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(4));
        assert_eq!(policy.delay_after(2), Duration::from_secs(8));
        assert_eq!(policy.delay_after(3), Duration::from_secs(10));
        assert_eq!(policy.delay_after(10), Duration::from_secs(10));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));

        let single = RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        };
        assert!(!single.should_retry(1));
    }

    #[test]
    fn test_deserialize_from_millis() {
        let policy: RetryPolicy =
            serde_yaml::from_str("max_attempts: 5\nbase_delay_ms: 250\nmax_delay_ms: 1000").unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_secs(1));
        assert_eq!(policy.backoff_factor, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let started = tokio::time::Instant::now();
        let result: Result<&str, RetryExhausted<String>> = RetryPolicy::default()
            .run("text", |_| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok("line")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "line");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 4s after the first failure, 8s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exhausts_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), RetryExhausted<String>> = RetryPolicy::default()
            .run("audio", |attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(format!("failure {attempt}"))
                }
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
