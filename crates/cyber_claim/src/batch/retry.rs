//! Failure classification and the fixed back-off retry policy.

use crate::chain::TxError;
use crate::config::RetryConfig;
use crate::workflow::WorkflowError;
use std::time::Duration;

/// Whether a fresh attempt from the start of the workflow may succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for TxError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

impl Retryable for WorkflowError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// Delay before attempt `attempt + 1`, or `None` when the record should stop.
    pub fn next_delay(&self, attempt: u32, error: &impl Retryable) -> Option<Duration> {
        if !error.is_retryable() || attempt >= self.max_attempts {
            return None;
        }
        Some(self.backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_after_max_attempts() {
        let policy = RetryPolicy::default();
        let err = TxError::Broadcast("connection refused".into());
        assert_eq!(policy.next_delay(1, &err), Some(Duration::from_secs(10)));
        assert_eq!(policy.next_delay(4, &err), Some(Duration::from_secs(10)));
        assert_eq!(policy.next_delay(5, &err), None);
    }

    #[test]
    fn terminal_errors_never_wait() {
        let policy = RetryPolicy::default();
        let missing = WorkflowError::MissingField {
            step: "create",
            field: "avatar",
        };
        assert_eq!(policy.next_delay(1, &missing), None);
        assert_eq!(policy.next_delay(1, &TxError::Malformed("x".into())), None);
    }

    #[test]
    fn zero_attempts_means_one() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 0,
            backoff_ms: 1,
        });
        assert_eq!(policy.max_attempts, 1);
    }
}
