//! Per-operation retry state.

use tea_core::{ClassifiedError, ErrorClassification};

/// Attempts made so far and the error from the most recent one.
///
/// Each logical operation owns its own context and updates it between
/// attempts; it is never shared between concurrently retried operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPolicyContext {
    /// Attempts already made. Zero before the first attempt.
    pub attempts_used: u32,
    /// Classification of the last error, or `None` if it exposed none.
    pub last_error: Option<ErrorClassification>,
}

impl RetryPolicyContext {
    /// Context before the first attempt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context after `attempts_used` attempts, the last one failing with `error`.
    pub fn with_error<E: ClassifiedError + ?Sized>(attempts_used: u32, error: &E) -> Self {
        Self {
            attempts_used,
            last_error: Some(ErrorClassification::of(error)),
        }
    }

    /// Record a failed attempt whose error can be classified.
    pub fn record_failure<E: ClassifiedError + ?Sized>(&mut self, error: &E) {
        self.attempts_used = self.attempts_used.saturating_add(1);
        self.last_error = Some(ErrorClassification::of(error));
    }

    /// Record a failed attempt whose error exposes no classification.
    pub fn record_unclassified_failure(&mut self) {
        self.attempts_used = self.attempts_used.saturating_add(1);
        self.last_error = None;
    }

    /// Whether no attempt has been made yet.
    pub fn is_first_attempt(&self) -> bool {
        self.attempts_used == 0
    }
}
