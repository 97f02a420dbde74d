//! Helpers for the older retry settings format.
//!
//! Before retry conditions existed, requests carried a flat `retry` object
//! (`retryable`, `maxAttempts`) and a `backoff` object (`policy`, `period`).
//! These helpers keep such configurations working; new code should build
//! [`RetryOptions`](crate::RetryOptions) instead.

use crate::jitter::{uniform_below, JitterSource};
use serde::{Deserialize, Serialize};
use std::error::Error;
use tea_core::SdkError;

/// Flat retry settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRetrySettings {
    /// Master switch.
    #[serde(default)]
    pub retryable: bool,
    /// Maximum number of retries.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Flat backoff settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyBackoffSettings {
    /// `"no"` disables waiting; any other value enables it.
    #[serde(default)]
    pub policy: Option<String>,
    /// Base unit in milliseconds.
    #[serde(default)]
    pub period: Option<u64>,
}

/// Whether retry number `retry_times` is allowed.
pub fn allow_retry(settings: Option<&LegacyRetrySettings>, retry_times: u32) -> bool {
    if retry_times == 0 {
        return true;
    }
    let Some(settings) = settings.filter(|s| s.retryable) else {
        return false;
    };
    matches!(settings.max_attempts, Some(max) if max >= retry_times)
}

/// Wait in milliseconds before retry number `retry_times`.
///
/// A random multiple of `period` in `[0, 2^retry_times - 1)`.
pub fn backoff_time(
    settings: Option<&LegacyBackoffSettings>,
    retry_times: u32,
    jitter: &dyn JitterSource,
) -> u64 {
    let Some(settings) = settings else {
        return 0;
    };
    match settings.policy.as_deref() {
        None | Some("no") => return 0,
        Some(_) => {}
    }
    let period = settings.period.unwrap_or(0);
    if period == 0 {
        return 0;
    }
    let span = 1u64
        .checked_shl(retry_times)
        .unwrap_or(u64::MAX)
        .saturating_sub(1);
    uniform_below(jitter, span).saturating_mul(period)
}

/// Whether a failed call is worth repeating, judged from the error alone.
///
/// No error is never retryable. An [`SdkError`] is retryable only for a
/// server-side status (500 and above), and not at all without a status code.
/// Any other error is assumed to be transient.
pub fn retryable(error: Option<&(dyn Error + 'static)>) -> bool {
    let Some(error) = error else {
        return false;
    };
    match error.downcast_ref::<SdkError>() {
        Some(sdk) => matches!(sdk.status_code, Some(status) if status >= 500),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::testing::FixedJitter;
    use crate::jitter::SeededJitter;
    use rstest::rstest;
    use serde_json::json;
    use tea_core::CastError;

    fn legacy(retryable: bool, max_attempts: Option<u32>) -> LegacyRetrySettings {
        LegacyRetrySettings {
            retryable,
            max_attempts,
        }
    }

    #[rstest]
    #[case(None, 0, true)]
    #[case(None, 1, false)]
    #[case(Some(legacy(false, Some(3))), 1, false)]
    #[case(Some(legacy(true, None)), 1, false)]
    #[case(Some(legacy(true, Some(3))), 3, true)]
    #[case(Some(legacy(true, Some(3))), 4, false)]
    fn test_allow_retry(
        #[case] settings: Option<LegacyRetrySettings>,
        #[case] retry_times: u32,
        #[case] expected: bool,
    ) {
        assert_eq!(allow_retry(settings.as_ref(), retry_times), expected);
    }

    #[test]
    fn test_backoff_time_disabled() {
        let jitter = FixedJitter(0.9);
        assert_eq!(backoff_time(None, 3, &jitter), 0);

        let no = LegacyBackoffSettings {
            policy: Some("no".into()),
            period: Some(10),
        };
        assert_eq!(backoff_time(Some(&no), 3, &jitter), 0);

        let missing_policy = LegacyBackoffSettings {
            policy: None,
            period: Some(10),
        };
        assert_eq!(backoff_time(Some(&missing_policy), 3, &jitter), 0);

        let zero_period = LegacyBackoffSettings {
            policy: Some("yes".into()),
            period: Some(0),
        };
        assert_eq!(backoff_time(Some(&zero_period), 3, &jitter), 0);
    }

    #[test]
    fn test_backoff_time_multiples_of_period() {
        let backoff = LegacyBackoffSettings {
            policy: Some("yes".into()),
            period: Some(3),
        };
        let jitter = SeededJitter::new(17);
        for _ in 0..200 {
            let t = backoff_time(Some(&backoff), 3, &jitter);
            assert_eq!(t % 3, 0);
            assert!(t < 7 * 3);
        }
        // 2^1 - 1 leaves a single slot
        assert_eq!(backoff_time(Some(&backoff), 1, &jitter), 0);
        assert_eq!(backoff_time(Some(&backoff), 0, &jitter), 0);
    }

    #[test]
    fn test_legacy_settings_deserialize() {
        let settings: LegacyRetrySettings =
            serde_json::from_str(r#"{"retryable": true, "maxAttempts": 2}"#).unwrap();
        assert!(allow_retry(Some(&settings), 2));
        assert!(!allow_retry(Some(&settings), 3));
    }

    #[rstest]
    #[case(json!({"code": "err"}), false)]
    #[case(json!({"code": "err", "statusCode": 400}), false)]
    #[case(json!({"code": "err", "statusCode": "400"}), false)]
    #[case(json!({"code": "err", "statusCode": 500}), true)]
    #[case(json!({"code": "err", "statusCode": "500"}), true)]
    #[case(json!({"code": "err", "statusCode": "test"}), false)]
    fn test_retryable_sdk_error(#[case] data: serde_json::Value, #[case] expected: bool) {
        let err = SdkError::new("err", "").with_data(data);
        assert_eq!(retryable(Some(&err)), expected);
    }

    #[test]
    fn test_retryable_without_sdk_error() {
        assert!(!retryable(None));

        let err = CastError::new("tea");
        assert!(retryable(Some(&err)));

        let unavailable = SdkError::new("err", "").with_status_code(503);
        let dynamic: &(dyn Error + 'static) = &unavailable;
        assert!(retryable(Some(dynamic)));
    }
}
