//! Retry policy for assessor calls.

use std::time::Duration;

use crate::error::FailureKind;

/// Predicate deciding whether a failure class is worth another attempt.
pub type RetryPredicate = fn(&FailureKind) -> bool;

/// Explicit retry policy injected at the assessor call boundary.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use vigil_council::{FailureKind, RetryPolicy};
///
/// let policy = RetryPolicy::new()
///     .with_max_attempts(4)
///     .with_backoff(vec![Duration::from_millis(50), Duration::from_millis(100)]);
///
/// assert!(policy.should_retry(&FailureKind::Timeout, 1));
/// assert!(!policy.should_retry(&FailureKind::malformed("?", "bad"), 1));
/// assert_eq!(policy.delay_for(3), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Vec<Duration>,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    /// Default policy: 3 attempts, 100ms/200ms/400ms backoff, transient failures only.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ],
            retryable: FailureKind::is_transient,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Vec::new(),
            retryable: FailureKind::is_transient,
        }
    }

    /// Sets the total number of attempts (including the first).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the backoff schedule. The last entry repeats once exhausted.
    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replaces the retryable-failure predicate.
    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    /// Returns the maximum number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if another attempt should follow `attempt` failing with `failure`.
    ///
    /// `attempt` is 1-based.
    pub fn should_retry(&self, failure: &FailureKind, attempt: u32) -> bool {
        attempt < self.max_attempts && (self.retryable)(failure)
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.backoff.is_empty() {
            return Duration::ZERO;
        }
        let idx = (attempt.saturating_sub(1) as usize).min(self.backoff.len() - 1);
        self.backoff[idx]
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::new();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    }

    #[test]
    fn test_schedule_repeats_last_entry() {
        let policy = RetryPolicy::new().with_backoff(vec![Duration::from_millis(5)]);
        assert_eq!(policy.delay_for(7), Duration::from_millis(5));
    }

    #[test]
    fn test_empty_schedule_is_zero_delay() {
        let policy = RetryPolicy::new().with_backoff(Vec::new());
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_attempt_bound() {
        let policy = RetryPolicy::new().with_max_attempts(2);
        assert!(policy.should_retry(&FailureKind::RateLimited, 1));
        assert!(!policy.should_retry(&FailureKind::RateLimited, 2));
    }

    #[test]
    fn test_no_retry_policy() {
        let policy = RetryPolicy::no_retry();
        assert!(!policy.should_retry(&FailureKind::Timeout, 1));
    }

    #[test]
    fn test_malformed_never_retried() {
        let policy = RetryPolicy::new().with_max_attempts(10);
        assert!(!policy.should_retry(&FailureKind::malformed("x", "y"), 1));
    }

    #[test]
    fn test_custom_predicate() {
        let policy = RetryPolicy::new().with_predicate(|k| matches!(k, FailureKind::Timeout));
        assert!(policy.should_retry(&FailureKind::Timeout, 1));
        assert!(!policy.should_retry(&FailureKind::RateLimited, 1));
    }
}
