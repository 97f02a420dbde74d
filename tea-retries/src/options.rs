//! Per-operation retry options.

use crate::condition::RetryCondition;

/// Retry options for one operation.
///
/// Options are built once before the retry loop and only read afterwards,
/// so a single value can be shared by every request of a client.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Master switch. When false nothing is retried.
    pub retryable: bool,
    /// Conditions that permit a retry, in precedence order.
    pub retry_conditions: Vec<RetryCondition>,
    /// Conditions that forbid a retry. Checked before `retry_conditions`.
    pub no_retry_conditions: Vec<RetryCondition>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            retryable: true,
            retry_conditions: Vec::new(),
            no_retry_conditions: Vec::new(),
        }
    }
}

impl RetryOptions {
    /// Create retryable options with no conditions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options that never retry.
    pub fn disabled() -> Self {
        Self::new().retryable(false)
    }

    /// Set the master switch.
    #[must_use]
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Append a condition that permits retries.
    #[must_use]
    pub fn retry_on(mut self, condition: RetryCondition) -> Self {
        self.retry_conditions.push(condition);
        self
    }

    /// Append a condition that forbids retries.
    #[must_use]
    pub fn no_retry_on(mut self, condition: RetryCondition) -> Self {
        self.no_retry_conditions.push(condition);
        self
    }
}
