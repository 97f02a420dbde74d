//! Retry decisions and backoff delays.
//!
//! [`should_retry`] and [`backoff_delay_millis`] are total: missing options,
//! unclassified errors and conditions without a backoff policy all resolve
//! to "do not retry" or to [`DEFAULT_MIN_DELAY`].

use crate::condition::RetryCondition;
use crate::context::RetryPolicyContext;
use crate::jitter::{JitterSource, ThreadRngJitter};
use crate::options::RetryOptions;
use std::sync::Arc;
use std::time::Duration;
use tea_core::ErrorClassification;
use tracing::{debug, trace};

/// Delay used whenever no policy applies: 100 milliseconds.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);

/// Decide whether another attempt should be made.
///
/// The first attempt is always permitted. Afterwards the error must be
/// classified, must match no entry of the no-retry list, and the first
/// matching retry condition must still have budget left.
pub fn should_retry(options: Option<&RetryOptions>, ctx: &RetryPolicyContext) -> bool {
    if ctx.attempts_used == 0 {
        return true;
    }
    let Some(options) = options.filter(|o| o.retryable) else {
        trace!(attempts_used = ctx.attempts_used, "Retrying disabled");
        return false;
    };
    let Some(error) = ctx.last_error.as_ref() else {
        trace!(
            attempts_used = ctx.attempts_used,
            "Last error is not classified"
        );
        return false;
    };

    if let Some(index) = options.no_retry_conditions.iter().position(|c| c.matches(error)) {
        debug!(
            condition = index,
            error_name = %error.name,
            error_code = %error.code,
            "Error matched a no-retry condition"
        );
        return false;
    }

    let Some((index, condition)) = first_match(&options.retry_conditions, error) else {
        debug!(
            error_name = %error.name,
            error_code = %error.code,
            "Error matched no retry condition"
        );
        return false;
    };

    if !condition.within_budget(ctx.attempts_used) {
        debug!(
            condition = index,
            attempts_used = ctx.attempts_used,
            max_attempts = condition.max_attempts.unwrap_or(0),
            "Retry budget exhausted"
        );
        return false;
    }
    if error.retryable == Some(false) {
        debug!(condition = index, "Error is flagged as not retryable");
        return false;
    }

    trace!(
        condition = index,
        attempts_used = ctx.attempts_used,
        "Retry permitted"
    );
    true
}

/// Delay in milliseconds before the next attempt.
///
/// A server-suggested retry-after wins over the condition's backoff policy
/// once a retry condition matches; both are capped by the condition's
/// maximum delay. No-retry conditions are not consulted.
pub fn backoff_delay_millis(
    options: Option<&RetryOptions>,
    ctx: &RetryPolicyContext,
    jitter: &dyn JitterSource,
) -> u64 {
    if ctx.attempts_used == 0 {
        return 0;
    }
    let min_delay = millis(DEFAULT_MIN_DELAY);
    let (Some(options), Some(error)) = (options, ctx.last_error.as_ref()) else {
        return min_delay;
    };
    let Some((index, condition)) = first_match(&options.retry_conditions, error) else {
        return min_delay;
    };

    let max_delay = millis(condition.effective_max_delay());
    let delay = if let Some(retry_after) = error.retry_after {
        millis(retry_after).min(max_delay)
    } else if let Some(policy) = condition.backoff {
        policy.delay_millis(ctx.attempts_used, jitter).min(max_delay)
    } else {
        min_delay
    };

    trace!(
        condition = index,
        attempts_used = ctx.attempts_used,
        delay_ms = delay,
        "Computed backoff delay"
    );
    delay
}

/// [`backoff_delay_millis`] as a [`Duration`].
pub fn backoff_delay(
    options: Option<&RetryOptions>,
    ctx: &RetryPolicyContext,
    jitter: &dyn JitterSource,
) -> Duration {
    Duration::from_millis(backoff_delay_millis(options, ctx, jitter))
}

fn first_match<'a>(
    conditions: &'a [RetryCondition],
    error: &ErrorClassification,
) -> Option<(usize, &'a RetryCondition)> {
    conditions.iter().enumerate().find(|(_, c)| c.matches(error))
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Retry options bundled with the random source used for jitter.
///
/// Cloning is cheap; clones share the options and the random source, so one
/// engine can serve every concurrent request of a client.
#[derive(Debug, Clone)]
pub struct RetryEngine {
    options: Option<Arc<RetryOptions>>,
    jitter: Arc<dyn JitterSource>,
}

impl Default for RetryEngine {
    fn default() -> Self {
        Self::unconfigured()
    }
}

impl RetryEngine {
    /// Create an engine for the given options.
    pub fn new(options: impl Into<Arc<RetryOptions>>) -> Self {
        Self {
            options: Some(options.into()),
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    /// Create an engine without options. It never retries.
    pub fn unconfigured() -> Self {
        Self {
            options: None,
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    /// Replace the random source.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// The options, if any.
    pub fn options(&self) -> Option<&RetryOptions> {
        self.options.as_deref()
    }

    /// See [`should_retry`].
    pub fn should_retry(&self, ctx: &RetryPolicyContext) -> bool {
        should_retry(self.options(), ctx)
    }

    /// See [`backoff_delay_millis`].
    pub fn backoff_delay_millis(&self, ctx: &RetryPolicyContext) -> u64 {
        backoff_delay_millis(self.options(), ctx, self.jitter.as_ref())
    }

    /// See [`backoff_delay`].
    pub fn backoff_delay(&self, ctx: &RetryPolicyContext) -> Duration {
        backoff_delay(self.options(), ctx, self.jitter.as_ref())
    }

    /// The wait before the next attempt, or `None` if it should not be made.
    pub fn next_delay(&self, ctx: &RetryPolicyContext) -> Option<Duration> {
        self.should_retry(ctx).then(|| self.backoff_delay(ctx))
    }
}
