//! Retry executor for running operations with retries.
//!
//! The engine only computes delays; this module is the caller side that
//! actually waits. Waiting goes through a [`Sleeper`] so callers can plug in
//! their own timer or cancellation.

use crate::context::RetryPolicyContext;
use crate::policy::{millis, RetryEngine};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tea_core::{ClassifiedError, ErrorClassification};
use tracing::{debug, warn};

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// State of a retry loop.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Attempts made, including the last one.
    pub attempt: u32,
    /// Last error message.
    pub last_error: Option<String>,
    /// Total time spent waiting.
    pub total_wait_time: Duration,
    /// History of attempts.
    pub history: Vec<AttemptInfo>,
}

/// Information about a single attempt.
#[derive(Debug, Clone)]
pub struct AttemptInfo {
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// Whether it succeeded.
    pub success: bool,
    /// Error message if failed.
    pub error: Option<String>,
    /// Time waited after this attempt.
    pub wait_time: Duration,
}

/// Execute an operation until it succeeds or the engine stops permitting retries.
///
/// The last error is returned unchanged.
///
/// # Example
///
/// ```ignore
/// use tea_retries::{with_retry, RetryEngine, RetryOptions, TokioSleeper};
///
/// let engine = RetryEngine::new(RetryOptions::from_json(config)?);
/// let body = with_retry(&engine, &TokioSleeper, || client.call(&request)).await?;
/// ```
pub async fn with_retry<F, Fut, T, E, S>(engine: &RetryEngine, sleeper: &S, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ClassifiedError + fmt::Display,
    S: Sleeper + ?Sized,
{
    let (result, _) = with_retry_state(engine, sleeper, operation).await;
    result
}

/// Execute with retries and get state information.
pub async fn with_retry_state<F, Fut, T, E, S>(
    engine: &RetryEngine,
    sleeper: &S,
    operation: F,
) -> (Result<T, E>, RetryState)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ClassifiedError + fmt::Display,
    S: Sleeper + ?Sized,
{
    with_retry_classified(
        engine,
        sleeper,
        |error: &E| Some(ErrorClassification::of(error)),
        operation,
    )
    .await
}

/// Execute with retries for errors that may not carry a classification.
///
/// `classify` maps each failure to the fields retry conditions match on.
/// Failures it returns `None` for are recorded as unclassified, so they are
/// never retried.
pub async fn with_retry_classified<F, Fut, T, E, C, S>(
    engine: &RetryEngine,
    sleeper: &S,
    classify: C,
    mut operation: F,
) -> (Result<T, E>, RetryState)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    C: Fn(&E) -> Option<ErrorClassification>,
    S: Sleeper + ?Sized,
{
    let mut ctx = RetryPolicyContext::new();
    let mut state = RetryState::default();

    loop {
        state.attempt += 1;
        debug!(attempt = state.attempt, "Executing retry attempt");

        match operation().await {
            Ok(result) => {
                state.history.push(AttemptInfo {
                    attempt: state.attempt,
                    success: true,
                    error: None,
                    wait_time: Duration::ZERO,
                });
                return (Ok(result), state);
            }
            Err(error) => {
                match classify(&error) {
                    Some(classification) => ctx.record_failure(&classification),
                    None => ctx.record_unclassified_failure(),
                }
                state.last_error = Some(error.to_string());

                let Some(wait) = engine.next_delay(&ctx) else {
                    let (name, code) = ctx
                        .last_error
                        .as_ref()
                        .map_or(("", ""), |c| (c.name.as_str(), c.code.as_str()));
                    warn!(
                        attempt = state.attempt,
                        classified = ctx.last_error.is_some(),
                        error_name = name,
                        error_code = code,
                        error = %error,
                        "Retry exhausted or error not retryable"
                    );
                    state.history.push(AttemptInfo {
                        attempt: state.attempt,
                        success: false,
                        error: state.last_error.clone(),
                        wait_time: Duration::ZERO,
                    });
                    return (Err(error), state);
                };

                state.total_wait_time += wait;
                state.history.push(AttemptInfo {
                    attempt: state.attempt,
                    success: false,
                    error: state.last_error.clone(),
                    wait_time: wait,
                });

                debug!(
                    attempt = state.attempt,
                    wait_ms = millis(wait),
                    error = %error,
                    "Waiting before retry"
                );

                sleeper.sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffPolicy;
    use crate::condition::RetryCondition;
    use crate::options::RetryOptions;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tea_core::SdkError;

    #[derive(Debug, Default)]
    struct RecordingSleeper {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().push(duration);
        }
    }

    fn throttling_engine(max_attempts: u32) -> RetryEngine {
        RetryEngine::new(
            RetryOptions::new().retry_on(
                RetryCondition::new()
                    .max_attempts(max_attempts)
                    .error_code("Throttling")
                    .backoff(BackoffPolicy::exponential(100, Some(10_000))),
            ),
        )
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let sleeper = RecordingSleeper::default();
        let result = with_retry(&throttling_engine(3), &sleeper, || async {
            Ok::<_, SdkError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert!(sleeper.waits.lock().is_empty());
    }

    #[tokio::test]
    async fn test_eventual_success() {
        let sleeper = RecordingSleeper::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry(&throttling_engine(3), &sleeper, || {
            let attempts = attempts_clone.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(SdkError::new("Throttling", "slow down"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.waits.lock(),
            vec![Duration::from_millis(200), Duration::from_millis(400)]
        );
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let sleeper = RecordingSleeper::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry(&throttling_engine(2), &sleeper, || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(SdkError::new("Throttling", "always"))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().code, "Throttling");
        // first attempt plus two retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.waits.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_error_is_not_retried() {
        let sleeper = RecordingSleeper::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry(&throttling_engine(3), &sleeper, || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(SdkError::new("InvalidParameter", "bad request"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_state() {
        let sleeper = RecordingSleeper::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let (result, state) = with_retry_state(&throttling_engine(3), &sleeper, || {
            let attempts = attempts_clone.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 1 {
                    Err(SdkError::new("Throttling", "error")
                        .with_retry_after(Duration::from_millis(50)))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(state.attempt, 2);
        assert_eq!(state.history.len(), 2);
        assert!(!state.history[0].success);
        assert_eq!(state.history[0].wait_time, Duration::from_millis(50));
        assert!(state.history[1].success);
        assert_eq!(state.total_wait_time, Duration::from_millis(50));
        assert_eq!(
            state.last_error.as_deref(),
            Some("SDKError: Throttling: error")
        );
    }

    #[test]
    fn test_with_tokio_sleeper() {
        let engine = RetryEngine::new(
            RetryOptions::new().retry_on(
                RetryCondition::new()
                    .max_attempts(1)
                    .error_code("Busy")
                    .backoff(BackoffPolicy::fixed(1)),
            ),
        );
        let attempts = AtomicU32::new(0);

        let result = tokio_test::block_on(with_retry(&engine, &TokioSleeper, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(SdkError::new("Busy", ""))
                } else {
                    Ok("done")
                }
            }
        }));

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    fn timeout_classifier(error: &std::io::Error) -> Option<ErrorClassification> {
        (error.kind() == std::io::ErrorKind::TimedOut)
            .then(|| ErrorClassification::new("TimeoutError"))
    }

    fn timeout_engine() -> RetryEngine {
        RetryEngine::new(
            RetryOptions::new().retry_on(
                RetryCondition::new()
                    .max_attempts(2)
                    .exception("TimeoutError")
                    .backoff(BackoffPolicy::fixed(10)),
            ),
        )
    }

    #[tokio::test]
    async fn test_classifier_retries_plain_errors() {
        let sleeper = RecordingSleeper::default();
        let attempts = AtomicU32::new(0);

        let (result, state) = with_retry_classified(
            &timeout_engine(),
            &sleeper,
            timeout_classifier,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "read timed out",
                    ))
                }
            },
        )
        .await;

        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::TimedOut);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.waits.lock(),
            vec![Duration::from_millis(10), Duration::from_millis(10)]
        );
        assert_eq!(state.last_error.as_deref(), Some("read timed out"));
    }

    #[tokio::test]
    async fn test_unclassified_error_is_not_retried() {
        let sleeper = RecordingSleeper::default();
        let attempts = AtomicU32::new(0);

        let (result, state) = with_retry_classified(
            &timeout_engine(),
            &sleeper,
            timeout_classifier,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "missing",
                    ))
                }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits.lock().is_empty());
        assert_eq!(state.history.len(), 1);
    }
}
