//! # tea-retries
//!
//! Retry decisions and backoff delays for the tea cloud-API client runtime.
//!
//! Given a failed attempt, the engine decides whether another attempt should
//! be made and how long to wait first. It never sleeps and never performs
//! I/O; callers wait on their own timer or use [`with_retry`].
//!
//! ## Core Concepts
//!
//! - **[`RetryCondition`]**: match errors by name or code to an attempt
//!   budget, a maximum delay and a [`BackoffPolicy`]
//! - **[`RetryOptions`]**: a master switch plus ordered retry and no-retry
//!   conditions
//! - **[`RetryPolicyContext`]**: attempts made so far and the last error
//! - **[`should_retry`]** / **[`backoff_delay_millis`]**: the two decisions
//! - **[`RetryEngine`]**: shared options plus an injected [`JitterSource`]
//!
//! ## Backoff Policies
//!
//! - [`BackoffPolicy::Fixed`]: constant delay
//! - [`BackoffPolicy::Random`]: uniform delay growing linearly with attempts
//! - [`BackoffPolicy::Exponential`]: doubling delay with cap
//! - [`BackoffPolicy::EqualJitter`]: doubling, half guaranteed, half random
//! - [`BackoffPolicy::FullJitter`]: doubling, fully random
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use tea_core::ErrorClassification;
//! use tea_retries::{BackoffPolicy, RetryCondition, RetryEngine, RetryOptions, RetryPolicyContext};
//!
//! let options = RetryOptions::new().retry_on(
//!     RetryCondition::new()
//!         .max_attempts(3)
//!         .exception("AErr")
//!         .backoff(BackoffPolicy::exponential(2, Some(60_000))),
//! );
//! let engine = RetryEngine::new(options);
//!
//! let ctx = RetryPolicyContext::with_error(2, &ErrorClassification::new("AErr"));
//! assert!(engine.should_retry(&ctx));
//! assert_eq!(engine.backoff_delay(&ctx), Duration::from_millis(8));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backoff;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod jitter;
pub mod legacy;
pub mod options;
pub mod policy;

// Re-exports
pub use backoff::{BackoffKind, BackoffPolicy, DEFAULT_EXPONENTIAL_CAP_MS, DEFAULT_RANDOM_CAP_MS};
pub use condition::{RetryCondition, DEFAULT_MAX_DELAY};
pub use config::{BackoffConfig, RetryConditionConfig, RetryOptionsConfig};
pub use context::RetryPolicyContext;
pub use error::{ConfigError, ConfigResult};
pub use executor::{
    with_retry, with_retry_classified, with_retry_state, AttemptInfo, RetryState, Sleeper,
    TokioSleeper,
};
pub use jitter::{JitterSource, SeededJitter, ThreadRngJitter};
pub use options::RetryOptions;
pub use policy::{backoff_delay, backoff_delay_millis, should_retry, RetryEngine, DEFAULT_MIN_DELAY};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        with_retry, BackoffPolicy, RetryCondition, RetryEngine, RetryOptions,
        RetryPolicyContext, TokioSleeper,
    };
    pub use tea_core::{ClassifiedError, ErrorClassification};
}
