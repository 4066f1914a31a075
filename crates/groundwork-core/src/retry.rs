//! Fixed-delay retry for outbound model calls
//!
//! Every call to an embedding or generation backend goes through one
//! [`RetryPolicy`]. Only errors classified as transient by
//! [`GroundworkError::is_transient`] are retried.

use crate::config::RetryConfig;
use crate::error::{GroundworkError, Result};
use std::future::Future;
use std::time::Duration;

/// Bounded attempts with a fixed delay between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }

    /// Single attempt, no delay
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// The last error is returned once attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}",
                        what,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::error!("{} failed after {} attempts: {}", what, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Shorthand used by backends for non-success HTTP responses
pub(crate) async fn status_error(response: reqwest::Response) -> GroundworkError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    GroundworkError::ExternalError { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> GroundworkError {
        GroundworkError::ExternalError {
            status: 503,
            body: "busy".to_string(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result = policy
            .run("probe", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result: Result<()> = policy
            .run("probe", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::ZERO);

        let result: Result<()> = policy
            .run("probe", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GroundworkError::Embedding("bad request".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        let _: Result<()> = policy.run("probe", || async { Err(transient()) }).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
