//! Configuration error types.

use thiserror::Error;

/// Errors raised while building retry options from configuration.
///
/// Decision functions never fail; these errors only surface when options
/// are constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backoff policy name is not one of the known aliases.
    #[error("unknown backoff policy: {0}")]
    UnknownBackoffPolicy(String),

    /// The configuration document could not be parsed.
    #[error("invalid retry configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_policy_message() {
        let err = ConfigError::UnknownBackoffPolicy("Linear".into());
        assert_eq!(err.to_string(), "unknown backoff policy: Linear");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ConfigError = json_err.into();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("invalid retry configuration"));
    }
}
