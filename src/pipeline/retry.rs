use crate::config::PipelineConfig;
use crate::pipeline::failure::PipelineFailure;
use std::future::Future;
use std::time::Duration;

/// Bounded retry policy: a fixed number of attempts with a fixed delay
/// between them. Every failure kind is retried the same way up to the cap;
/// only the final outcome is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.retry_attempts,
            Duration::from_secs(config.retry_delay_secs),
        )
    }

    /// Drive `attempt_fn` to completion under this policy.
    ///
    /// Attempts run strictly one after another; intermediate failures are
    /// logged and retried after the fixed delay. Once the cap is reached the
    /// last failure is folded into an exhausted-retries error.
    pub async fn run<T, Fut>(
        &self,
        mut attempt_fn: impl FnMut(u32) -> Fut,
    ) -> Result<T, PipelineFailure>
    where
        Fut: Future<Output = Result<T, PipelineFailure>>,
    {
        let mut last_failure: Option<PipelineFailure> = None;

        for attempt in 1..=self.max_attempts {
            match attempt_fn(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        log::info!("Attempt {}/{} succeeded", attempt, self.max_attempts);
                    }
                    return Ok(value);
                }
                Err(failure) => {
                    log::warn!(
                        "Attempt {}/{} failed: {}",
                        attempt,
                        self.max_attempts,
                        failure
                    );
                    last_failure = Some(failure);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        Err(PipelineFailure::exhausted_retries(
            self.max_attempts,
            last_failure.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::failure::PipelineFailureKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_policy_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }

    #[test]
    fn test_at_least_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_first_success_skips_retries() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<u32, PipelineFailure> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_after_cap() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<u32, PipelineFailure> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PipelineFailure::timeout()) }
            })
            .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.kind, PipelineFailureKind::ExhaustedRetries);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_paces_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        let result: Result<u32, PipelineFailure> = policy
            .run(|_| async { Err(PipelineFailure::timeout()) })
            .await;

        assert!(result.is_err());
        // Two inter-attempt delays for three attempts, none after the last
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_sleeps_zero() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        let result: Result<u32, PipelineFailure> = policy.run(|_| async { Ok(1) }).await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_recovers_mid_sequence() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<u32, PipelineFailure> = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(PipelineFailure::network_unreachable("flaky"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
