//! Error classification for the tea runtime.
//!
//! Retry decisions never look at an error's concrete type. They only need a
//! symbolic name, a code and an optional server hint for how long to wait.
//! [`ClassifiedError`] is that capability; [`ErrorClassification`] is an
//! owned snapshot of it that can outlive the error it was taken from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// An error that exposes the fields retry conditions match on.
pub trait ClassifiedError {
    /// Symbolic error category, e.g. `"ThrottlingError"`.
    fn name(&self) -> &str;

    /// Server or protocol specific error code. May be empty.
    fn code(&self) -> &str;

    /// Server-suggested wait before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    /// Explicit retryability flag carried by the error itself.
    ///
    /// `None` means the error has no opinion and the configured conditions
    /// decide alone.
    fn retryable(&self) -> Option<bool> {
        None
    }
}

impl<T: ClassifiedError + ?Sized> ClassifiedError for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn code(&self) -> &str {
        (**self).code()
    }

    fn retry_after(&self) -> Option<Duration> {
        (**self).retry_after()
    }

    fn retryable(&self) -> Option<bool> {
        (**self).retryable()
    }
}

impl<T: ClassifiedError + ?Sized> ClassifiedError for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn code(&self) -> &str {
        (**self).code()
    }

    fn retry_after(&self) -> Option<Duration> {
        (**self).retry_after()
    }

    fn retryable(&self) -> Option<bool> {
        (**self).retryable()
    }
}

/// Owned snapshot of a [`ClassifiedError`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorClassification {
    /// Symbolic error name.
    pub name: String,
    /// Error code.
    #[serde(default)]
    pub code: String,
    /// Server-suggested wait.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_millis_serde"
    )]
    pub retry_after: Option<Duration>,
    /// Explicit retryability flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorClassification {
    /// Create a classification with a name and no code.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Take a snapshot of any classified error.
    pub fn of<E: ClassifiedError + ?Sized>(error: &E) -> Self {
        Self {
            name: error.name().to_owned(),
            code: error.code().to_owned(),
            retry_after: error.retry_after(),
            retryable: error.retryable(),
        }
    }

    /// Set the error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Set the server-suggested wait.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Set the explicit retryability flag.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}

impl ClassifiedError for ErrorClassification {
    fn name(&self) -> &str {
        &self.name
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    fn retryable(&self) -> Option<bool> {
        self.retryable
    }
}

/// Error returned by the runtime when a service call fails.
#[derive(Error, Debug, Clone, Default, PartialEq)]
pub struct SdkError {
    /// Error code reported by the service.
    pub code: String,
    /// HTTP status code, when the failure came from a response.
    pub status_code: Option<u16>,
    /// Human readable message.
    pub message: String,
    /// Additional description.
    pub description: Option<String>,
    /// Raw response data.
    pub data: Option<serde_json::Value>,
    /// Server-suggested wait.
    pub retry_after: Option<Duration>,
    /// Explicit retryability flag.
    pub retryable: Option<bool>,
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SDKError: {}", self.code)?;
        if let Some(status) = self.status_code {
            write!(f, " (status {})", status)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl SdkError {
    /// Symbolic name shared by every SDK error.
    pub const NAME: &'static str = "SDKError";

    /// Create an SDK error with a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the HTTP status code.
    #[must_use]
    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach raw response data.
    ///
    /// A `statusCode` field inside the data fills in the status code when
    /// none was set, whether it is a number or a numeric string.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        if self.status_code.is_none() {
            self.status_code = data.get("statusCode").and_then(status_from_value);
        }
        self.data = Some(data);
        self
    }

    /// Set the server-suggested wait.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Set the explicit retryability flag.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}

impl ClassifiedError for SdkError {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    fn retryable(&self) -> Option<bool> {
        self.retryable
    }
}

fn status_from_value(value: &serde_json::Value) -> Option<u16> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// A value could not be converted to the requested type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CastError {
    /// What failed to convert.
    pub message: String,
    /// Optional error code.
    pub code: String,
}

impl CastError {
    /// Symbolic name of cast failures.
    pub const NAME: &'static str = "CastError";

    /// Create a cast error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: String::new(),
        }
    }
}

impl ClassifiedError for CastError {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn code(&self) -> &str {
        &self.code
    }
}

mod option_millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => u64::try_from(d.as_millis())
                .unwrap_or(u64::MAX)
                .serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<u64> = Option::deserialize(deserializer)?;
        Ok(opt.map(Duration::from_millis))
    }
}
