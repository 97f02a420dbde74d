//! Declarative retry configuration.
//!
//! Request-level configuration describes retry options with the runtime's
//! camelCase keys:
//!
//! ```json
//! {
//!   "retryable": true,
//!   "retryCondition": [{
//!     "maxAttempts": 3,
//!     "maxDelay": 5000,
//!     "exception": ["ThrottlingError"],
//!     "errorCode": ["Throttling.User"],
//!     "backoff": { "policy": "ExponentialWithEqualJitter", "period": 200, "cap": 10000 }
//!   }],
//!   "noRetryCondition": [{ "errorCode": ["InvalidParameter"] }]
//! }
//! ```
//!
//! Durations are in milliseconds. An unknown backoff policy name fails the
//! whole document with [`ConfigError::UnknownBackoffPolicy`].

use crate::backoff::BackoffPolicy;
use crate::condition::RetryCondition;
use crate::error::{ConfigError, ConfigResult};
use crate::options::RetryOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff section of a retry condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Policy name, matched case-insensitively.
    pub policy: String,
    /// Base unit in milliseconds.
    #[serde(default)]
    pub period: u64,
    /// Maximum delay in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<u64>,
}

impl TryFrom<BackoffConfig> for BackoffPolicy {
    type Error = ConfigError;

    fn try_from(config: BackoffConfig) -> ConfigResult<Self> {
        BackoffPolicy::parse(&config.policy, config.period, config.cap)
    }
}

/// One entry of `retryCondition` or `noRetryCondition`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConditionConfig {
    /// Attempt budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Maximum delay in milliseconds.
    #[serde(
        default,
        alias = "MaxDelay",
        alias = "maxDelayTimeMillis",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_delay: Option<u64>,
    /// Error names.
    #[serde(default)]
    pub exception: Vec<String>,
    /// Error codes.
    #[serde(default)]
    pub error_code: Vec<String>,
    /// Backoff policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffConfig>,
}

impl TryFrom<RetryConditionConfig> for RetryCondition {
    type Error = ConfigError;

    fn try_from(config: RetryConditionConfig) -> ConfigResult<Self> {
        let backoff = config.backoff.map(BackoffPolicy::try_from).transpose()?;
        Ok(RetryCondition {
            max_attempts: config.max_attempts,
            max_delay: config.max_delay.map(Duration::from_millis),
            exception_names: config.exception.into_iter().collect(),
            error_codes: config.error_code.into_iter().collect(),
            backoff,
        })
    }
}

/// Retry options as they appear in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOptionsConfig {
    /// Master switch. Defaults to false when missing.
    #[serde(default)]
    pub retryable: bool,
    /// Conditions that permit retries.
    #[serde(default)]
    pub retry_condition: Vec<RetryConditionConfig>,
    /// Conditions that forbid retries.
    #[serde(default)]
    pub no_retry_condition: Vec<RetryConditionConfig>,
}

impl TryFrom<RetryOptionsConfig> for RetryOptions {
    type Error = ConfigError;

    fn try_from(config: RetryOptionsConfig) -> ConfigResult<Self> {
        Ok(RetryOptions {
            retryable: config.retryable,
            retry_conditions: conditions(config.retry_condition)?,
            no_retry_conditions: conditions(config.no_retry_condition)?,
        })
    }
}

fn conditions(configs: Vec<RetryConditionConfig>) -> ConfigResult<Vec<RetryCondition>> {
    configs.into_iter().map(RetryCondition::try_from).collect()
}

impl RetryOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: RetryOptionsConfig = serde_json::from_str(json)?;
        config.try_into()
    }

    /// Build options from an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> ConfigResult<Self> {
        let config: RetryOptionsConfig = serde_json::from_value(value)?;
        config.try_into()
    }
}
