//! Recovery executor: attempt accounting and the retry delay itself.
//!
//! "Recovery" here is only the wait. The executor never re-invokes the
//! operation that failed; a successful attempt means the delay elapsed and
//! the caller may retry its own call.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use rand::Rng;

use super::classify::{Decision, RecoveryStrategy};

/// Bound on tracked identity keys. Oldest keys are evicted first, mirroring
/// the history store, so a long-lived process cannot grow the map without
/// limit.
const MAX_TRACKED_KEYS: usize = 256;

/// Largest jitter added to exponential backoff delays.
const MAX_JITTER_MS: u64 = 1000;

/// Tracks per-identity attempt counts and executes recovery delays.
#[derive(Debug, Default)]
pub struct RecoveryExecutor {
    attempts: HashMap<String, u32>,
    insertion_order: VecDeque<String>,
}

impl RecoveryExecutor {
    /// Creates an executor with no recorded attempts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts recovery for `key` under `decision`.
    ///
    /// Returns false without waiting when the retry budget is exhausted or
    /// the decision carries no usable strategy. Otherwise increments the
    /// attempt counter, sleeps for the computed delay and returns true.
    pub async fn attempt(&mut self, decision: &Decision, key: &str) -> bool {
        if decision.strategy == RecoveryStrategy::None {
            return false;
        }

        let attempts = self.attempt_count(key);
        if attempts >= decision.max_retries {
            tracing::debug!(
                key,
                attempts,
                max_retries = decision.max_retries,
                "retry budget exhausted"
            );
            return false;
        }

        self.record_attempt(key);
        let delay = delay_for(decision.strategy, decision.retry_delay, attempts);
        tracing::info!(
            key,
            attempt = attempts + 1,
            max_retries = decision.max_retries,
            delay_ms = delay.as_millis() as u64,
            "waiting before retry"
        );
        tokio::time::sleep(delay).await;
        true
    }

    /// Attempts already recorded for `key`.
    pub fn attempt_count(&self, key: &str) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }

    /// Number of identity keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }

    /// Drops all recorded attempts.
    pub fn clear(&mut self) {
        self.attempts.clear();
        self.insertion_order.clear();
    }

    fn record_attempt(&mut self, key: &str) {
        if !self.attempts.contains_key(key) {
            if self.insertion_order.len() == MAX_TRACKED_KEYS {
                if let Some(evicted) = self.insertion_order.pop_front() {
                    self.attempts.remove(&evicted);
                }
            }
            self.insertion_order.push_back(key.to_string());
        }
        *self.attempts.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// Computes the delay for one recovery attempt.
///
/// `attempt` is the count of attempts already made, so the first backoff
/// attempt waits the base delay unscaled.
pub fn delay_for(strategy: RecoveryStrategy, base: Duration, attempt: u32) -> Duration {
    match strategy {
        RecoveryStrategy::None => Duration::ZERO,
        RecoveryStrategy::Retry => base,
        RecoveryStrategy::RetryWithBackoff => scale(base, attempt),
        RecoveryStrategy::RetryWithExponentialBackoff => {
            let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
            scale(base, attempt) + Duration::from_millis(jitter)
        }
    }
}

fn scale(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.min(31);
    let multiplier = 1u64 << exponent;
    Duration::from_millis((base.as_millis() as u64).saturating_mul(multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(strategy: RecoveryStrategy, max_retries: u32, delay_ms: u64) -> Decision {
        use crate::error::record::{ErrorKind, Severity};
        Decision {
            kind: ErrorKind::Network,
            severity: Severity::Medium,
            recoverable: true,
            strategy,
            retryable: true,
            max_retries,
            retry_delay: Duration::from_millis(delay_ms),
            user_action: String::new(),
        }
    }

    #[test]
    fn test_delay_fixed_for_retry() {
        let base = Duration::from_millis(2000);
        assert_eq!(delay_for(RecoveryStrategy::Retry, base, 0), base);
        assert_eq!(delay_for(RecoveryStrategy::Retry, base, 4), base);
    }

    #[test]
    fn test_delay_doubles_with_backoff() {
        let base = Duration::from_millis(1000);
        assert_eq!(
            delay_for(RecoveryStrategy::RetryWithBackoff, base, 0),
            Duration::from_millis(1000)
        );
        assert_eq!(
            delay_for(RecoveryStrategy::RetryWithBackoff, base, 1),
            Duration::from_millis(2000)
        );
        assert_eq!(
            delay_for(RecoveryStrategy::RetryWithBackoff, base, 3),
            Duration::from_millis(8000)
        );
    }

    #[test]
    fn test_delay_exponential_adds_bounded_jitter() {
        let base = Duration::from_millis(1000);
        let delay = delay_for(RecoveryStrategy::RetryWithExponentialBackoff, base, 1);
        assert!(delay >= Duration::from_millis(2000));
        assert!(delay <= Duration::from_millis(2000 + MAX_JITTER_MS));
    }

    #[test]
    fn test_delay_scale_does_not_overflow() {
        let base = Duration::from_millis(1000);
        let delay = delay_for(RecoveryStrategy::RetryWithBackoff, base, u32::MAX);
        assert!(delay >= base);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_counts_per_key() {
        let mut executor = RecoveryExecutor::new();
        let decision = decision(RecoveryStrategy::Retry, 2, 10);

        assert!(executor.attempt(&decision, "key-a").await);
        assert!(executor.attempt(&decision, "key-a").await);
        assert_eq!(executor.attempt_count("key-a"), 2);

        // Budget exhausted for key-a, but key-b is untouched.
        assert!(!executor.attempt(&decision, "key-a").await);
        assert!(executor.attempt(&decision, "key-b").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_refuses_none_strategy() {
        let mut executor = RecoveryExecutor::new();
        let decision = decision(RecoveryStrategy::None, 3, 10);
        assert!(!executor.attempt(&decision, "key").await);
        assert_eq!(executor.attempt_count("key"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_refuses_zero_budget() {
        let mut executor = RecoveryExecutor::new();
        let decision = decision(RecoveryStrategy::Retry, 0, 10);
        assert!(!executor.attempt(&decision, "key").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracked_keys_are_bounded() {
        let mut executor = RecoveryExecutor::new();
        let decision = decision(RecoveryStrategy::Retry, 1, 1);

        for i in 0..(MAX_TRACKED_KEYS + 10) {
            executor.attempt(&decision, &format!("key-{i}")).await;
        }
        assert_eq!(executor.tracked_keys(), MAX_TRACKED_KEYS);
        // The first key was evicted, so its count reads as zero again.
        assert_eq!(executor.attempt_count("key-0"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_counts() {
        let mut executor = RecoveryExecutor::new();
        let decision = decision(RecoveryStrategy::Retry, 1, 1);

        executor.attempt(&decision, "key").await;
        assert!(!executor.attempt(&decision, "key").await);

        executor.clear();
        assert_eq!(executor.tracked_keys(), 0);
        assert!(executor.attempt(&decision, "key").await);
    }
}
