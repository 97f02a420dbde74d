//! Backoff policies.
//!
//! Every policy maps the number of attempts already made to a delay in
//! milliseconds. Exponential growth uses saturating integer arithmetic and is
//! clamped to the cap before any randomization.

use crate::error::{ConfigError, ConfigResult};
use crate::jitter::{uniform_below, JitterSource};
use std::str::FromStr;

/// Default cap for [`BackoffPolicy::Random`]: 20 seconds.
pub const DEFAULT_RANDOM_CAP_MS: u64 = 20 * 1000;

/// Default cap for the exponential family: 3 days.
pub const DEFAULT_EXPONENTIAL_CAP_MS: u64 = 3 * 24 * 60 * 60 * 1000;

/// Backoff policy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackoffKind {
    /// Constant delay.
    Fixed,
    /// Uniform delay growing linearly with attempts.
    Random,
    /// Doubling delay.
    Exponential,
    /// Doubling delay, half guaranteed and half randomized.
    EqualJitter,
    /// Doubling delay, fully randomized.
    FullJitter,
}

impl BackoffKind {
    /// Resolve a policy name, ignoring case.
    ///
    /// `"Exponential"` and `"ExponentialWithEqualJitter"` both resolve to
    /// [`BackoffKind::EqualJitter`]; `"ExponentialWithFullJitter"` resolves
    /// to [`BackoffKind::FullJitter`]. The deterministic
    /// [`BackoffKind::Exponential`] has no name and is only built in code.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "random" => Some(Self::Random),
            "exponential" | "exponentialwithequaljitter" | "equaljitter" => {
                Some(Self::EqualJitter)
            }
            "fulljitter" | "exponentialwithfulljitter" => Some(Self::FullJitter),
            _ => None,
        }
    }

    /// Cap used when none is configured. `None` for uncapped policies.
    pub fn default_cap_ms(self) -> Option<u64> {
        match self {
            Self::Fixed => None,
            Self::Random => Some(DEFAULT_RANDOM_CAP_MS),
            Self::Exponential | Self::EqualJitter | Self::FullJitter => {
                Some(DEFAULT_EXPONENTIAL_CAP_MS)
            }
        }
    }
}

impl FromStr for BackoffKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ConfigError::UnknownBackoffPolicy(s.to_owned()))
    }
}

/// A stateless backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackoffPolicy {
    /// `delay = period`.
    Fixed {
        /// Delay in milliseconds.
        period_ms: u64,
    },
    /// `delay = uniform(0, min(cap, period * attempts))`.
    Random {
        /// Base unit in milliseconds.
        period_ms: u64,
        /// Maximum delay in milliseconds.
        cap_ms: u64,
    },
    /// `delay = min(cap, period * 2^attempts)`.
    Exponential {
        /// Base unit in milliseconds.
        period_ms: u64,
        /// Maximum delay in milliseconds.
        cap_ms: u64,
    },
    /// `delay = ceil/2 + uniform(0, ceil/2)` with `ceil = min(cap, period * 2^attempts)`.
    ///
    /// The result lies in `[ceil/2, ceil)`: the floor itself is reachable.
    EqualJitter {
        /// Base unit in milliseconds.
        period_ms: u64,
        /// Maximum delay in milliseconds.
        cap_ms: u64,
    },
    /// `delay = uniform(0, ceil)` with `ceil = min(cap, period * 2^attempts)`.
    FullJitter {
        /// Base unit in milliseconds.
        period_ms: u64,
        /// Maximum delay in milliseconds.
        cap_ms: u64,
    },
}

impl BackoffPolicy {
    /// Constant delay.
    #[must_use]
    pub fn fixed(period_ms: u64) -> Self {
        Self::Fixed { period_ms }
    }

    /// Linear random delay; a missing cap defaults to 20 seconds.
    #[must_use]
    pub fn random(period_ms: u64, cap_ms: Option<u64>) -> Self {
        Self::build(BackoffKind::Random, period_ms, cap_ms)
    }

    /// Doubling delay; a missing cap defaults to 3 days.
    #[must_use]
    pub fn exponential(period_ms: u64, cap_ms: Option<u64>) -> Self {
        Self::build(BackoffKind::Exponential, period_ms, cap_ms)
    }

    /// Doubling delay with equal jitter; a missing cap defaults to 3 days.
    #[must_use]
    pub fn equal_jitter(period_ms: u64, cap_ms: Option<u64>) -> Self {
        Self::build(BackoffKind::EqualJitter, period_ms, cap_ms)
    }

    /// Doubling delay with full jitter; a missing cap defaults to 3 days.
    #[must_use]
    pub fn full_jitter(period_ms: u64, cap_ms: Option<u64>) -> Self {
        Self::build(BackoffKind::FullJitter, period_ms, cap_ms)
    }

    /// Build a policy of the given kind.
    #[must_use]
    pub fn build(kind: BackoffKind, period_ms: u64, cap_ms: Option<u64>) -> Self {
        let cap_ms = cap_ms.or(kind.default_cap_ms()).unwrap_or(u64::MAX);
        match kind {
            BackoffKind::Fixed => Self::Fixed { period_ms },
            BackoffKind::Random => Self::Random { period_ms, cap_ms },
            BackoffKind::Exponential => Self::Exponential { period_ms, cap_ms },
            BackoffKind::EqualJitter => Self::EqualJitter { period_ms, cap_ms },
            BackoffKind::FullJitter => Self::FullJitter { period_ms, cap_ms },
        }
    }

    /// Build a policy from its configured name, or `None` if the name is unknown.
    pub fn from_name(name: &str, period_ms: u64, cap_ms: Option<u64>) -> Option<Self> {
        BackoffKind::from_name(name).map(|kind| Self::build(kind, period_ms, cap_ms))
    }

    /// Build a policy from its configured name.
    pub fn parse(name: &str, period_ms: u64, cap_ms: Option<u64>) -> ConfigResult<Self> {
        let kind: BackoffKind = name.parse()?;
        Ok(Self::build(kind, period_ms, cap_ms))
    }

    /// The policy's variant.
    pub fn kind(&self) -> BackoffKind {
        match self {
            Self::Fixed { .. } => BackoffKind::Fixed,
            Self::Random { .. } => BackoffKind::Random,
            Self::Exponential { .. } => BackoffKind::Exponential,
            Self::EqualJitter { .. } => BackoffKind::EqualJitter,
            Self::FullJitter { .. } => BackoffKind::FullJitter,
        }
    }

    /// Base unit in milliseconds.
    pub fn period_ms(&self) -> u64 {
        match *self {
            Self::Fixed { period_ms }
            | Self::Random { period_ms, .. }
            | Self::Exponential { period_ms, .. }
            | Self::EqualJitter { period_ms, .. }
            | Self::FullJitter { period_ms, .. } => period_ms,
        }
    }

    /// Maximum delay in milliseconds. `None` for [`BackoffPolicy::Fixed`].
    pub fn cap_ms(&self) -> Option<u64> {
        match *self {
            Self::Fixed { .. } => None,
            Self::Random { cap_ms, .. }
            | Self::Exponential { cap_ms, .. }
            | Self::EqualJitter { cap_ms, .. }
            | Self::FullJitter { cap_ms, .. } => Some(cap_ms),
        }
    }

    /// Delay in milliseconds before the next attempt, given the attempts already made.
    pub fn delay_millis(&self, attempts_used: u32, jitter: &dyn JitterSource) -> u64 {
        match *self {
            Self::Fixed { period_ms } => period_ms,
            Self::Random { period_ms, cap_ms } => {
                let ceil = period_ms
                    .saturating_mul(u64::from(attempts_used))
                    .min(cap_ms);
                uniform_below(jitter, ceil)
            }
            Self::Exponential { period_ms, cap_ms } => expo(period_ms, cap_ms, attempts_used),
            Self::EqualJitter { period_ms, cap_ms } => {
                let ceil = expo(period_ms, cap_ms, attempts_used);
                let half = ceil / 2;
                half + uniform_below(jitter, ceil - half)
            }
            Self::FullJitter { period_ms, cap_ms } => {
                uniform_below(jitter, expo(period_ms, cap_ms, attempts_used))
            }
        }
    }
}

fn expo(period_ms: u64, cap_ms: u64, attempts: u32) -> u64 {
    let mul = 1u64.checked_shl(attempts).unwrap_or(u64::MAX);
    period_ms.saturating_mul(mul).min(cap_ms)
}
