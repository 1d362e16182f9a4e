//! Retry with exponential backoff
//!
//! Storage backends fail transiently; every store interaction goes through
//! [`with_retry`], which re-attempts a bounded number of times with
//! exponentially growing, jittered delays. Errors that survive all attempts
//! propagate unchanged.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Default retry count after the initial attempt
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first re-attempt
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Default backoff ceiling
const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// Jitter applied to each delay, as a fraction of the capped value
const JITTER_RATIO: f64 = 0.2;

// ============================================================================
// Retry Policy
// ============================================================================

/// Backoff configuration shared by the store gateway and the processing
/// session
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Re-attempts after the initial try (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Delay before the first re-attempt
    pub base_delay: Duration,
    /// Upper bound on any single delay, before jitter
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before re-attempt number `attempt` (zero-based)
    ///
    /// Doubles the base delay per attempt, caps at `max_delay`, then
    /// perturbs the result by ±20% so simultaneous retries spread out.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);

        let capped_ms = capped.as_millis() as u64;
        if capped_ms == 0 {
            return Duration::ZERO;
        }

        let spread = (capped_ms as f64 * JITTER_RATIO) as u64;
        let jittered = rand::rng().random_range(capped_ms - spread..=capped_ms + spread);
        Duration::from_millis(jittered)
    }
}

// ============================================================================
// Retry Executor
// ============================================================================

/// Run `operation` until it succeeds or the policy is exhausted
///
/// The closure is invoked once per attempt. Between failed attempts the
/// calling task sleeps for the policy's backoff delay; the final failure's
/// error is returned as-is.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = policy.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Attempt failed, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::warn!(
                    operation = operation_name,
                    attempts = attempt + 1,
                    error = %err,
                    "All attempts exhausted"
                );
                return Err(err);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
