//! Retry conditions.

use crate::backoff::BackoffPolicy;
use std::collections::HashSet;
use std::time::Duration;
use tea_core::ClassifiedError;

/// Maximum delay applied when a condition does not set one: 120 seconds.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(120);

/// A rule matching errors by name or code to a retry budget and a backoff policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryCondition {
    /// Attempts allowed under this condition. Ignored in no-retry lists.
    pub max_attempts: Option<u32>,
    /// Upper bound on the delay. Defaults to [`DEFAULT_MAX_DELAY`].
    pub max_delay: Option<Duration>,
    /// Error names this condition matches.
    pub exception_names: HashSet<String>,
    /// Error codes this condition matches.
    pub error_codes: HashSet<String>,
    /// How to compute the delay. Without one the minimum delay is used.
    pub backoff: Option<BackoffPolicy>,
}

impl RetryCondition {
    /// Create an empty condition that matches nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget.
    #[must_use]
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    /// Set the maximum delay.
    #[must_use]
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_delay = Some(d);
        self
    }

    /// Match an error name.
    #[must_use]
    pub fn exception(mut self, name: impl Into<String>) -> Self {
        self.exception_names.insert(name.into());
        self
    }

    /// Match several error names.
    #[must_use]
    pub fn exceptions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exception_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Match an error code.
    #[must_use]
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_codes.insert(code.into());
        self
    }

    /// Match several error codes.
    #[must_use]
    pub fn error_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error_codes.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Set the backoff policy.
    #[must_use]
    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = Some(policy);
        self
    }

    /// Whether the error's name or code is listed by this condition.
    ///
    /// Exact membership only. An empty name or code never matches.
    pub fn matches<E: ClassifiedError + ?Sized>(&self, error: &E) -> bool {
        let name = error.name();
        let code = error.code();
        (!name.is_empty() && self.exception_names.contains(name))
            || (!code.is_empty() && self.error_codes.contains(code))
    }

    /// The configured maximum delay, or [`DEFAULT_MAX_DELAY`].
    pub fn effective_max_delay(&self) -> Duration {
        self.max_delay.unwrap_or(DEFAULT_MAX_DELAY)
    }

    /// Whether `attempts_used` is still within this condition's budget.
    pub fn within_budget(&self, attempts_used: u32) -> bool {
        attempts_used <= self.max_attempts.unwrap_or(0)
    }
}
