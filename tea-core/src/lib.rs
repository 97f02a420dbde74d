//! # tea-core
//!
//! Core types for the tea cloud-API client runtime.
//!
//! The retry engine in `tea-retries` only needs to know three things about a
//! failed attempt: the error's symbolic name, its code, and whether the server
//! asked the client to wait for a given time. This crate defines that
//! capability ([`ClassifiedError`]) together with the runtime's own error
//! values that implement it.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use tea_core::{ClassifiedError, SdkError};
//!
//! let err = SdkError::new("Throttling", "request was denied due to flow control")
//!     .with_status_code(429)
//!     .with_retry_after(Duration::from_secs(2));
//!
//! assert_eq!(err.name(), "SDKError");
//! assert_eq!(err.code(), "Throttling");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod errors;

pub use errors::{CastError, ClassifiedError, ErrorClassification, SdkError};
