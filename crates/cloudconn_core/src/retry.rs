//! Retry policy and the retry layer.

use crate::error::ConnectorResult;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Rejected retry policy settings.
#[derive(Debug, Error, PartialEq)]
pub enum RetryPolicyError {
    /// `max_attempts` was zero.
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    /// The multiplier would shrink the delay or is not a number.
    #[error("multiplier must be a finite number >= 1.0, got {0}")]
    Multiplier(f64),
}

/// How often and how patiently a `Transient` failure is retried.
///
/// Immutable once attached to a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    max_attempts: u32,
    #[serde(with = "seconds")]
    base_delay: Duration,
    multiplier: f64,
    #[serde(with = "seconds")]
    jitter: Duration,
    #[serde(with = "seconds")]
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with `max_attempts` total invocations and default delays.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: Duration::from_millis(50),
            max_delay: Duration::from_secs(30),
        }
    }

    /// A policy that invokes the operation exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Sets the maximum number of invocations.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the backoff growth factor.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the upper bound of the random extra delay.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the cap on a single backoff delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Maximum number of invocations.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Backoff growth factor.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Upper bound of the random extra delay.
    #[must_use]
    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Cap on a single backoff delay.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Checks the settings.
    pub fn validate(&self) -> Result<(), RetryPolicyError> {
        if self.max_attempts == 0 {
            return Err(RetryPolicyError::ZeroAttempts);
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(RetryPolicyError::Multiplier(self.multiplier));
        }
        Ok(())
    }

    /// Deterministic part of the wait after failed attempt `attempt` (0-based).
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// Full wait after failed attempt `attempt` (0-based), jitter included.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let backoff = self.backoff_for_attempt(attempt);
        if self.jitter.is_zero() {
            return backoff;
        }
        let extra = rand::thread_rng().gen_range(Duration::ZERO..=self.jitter);
        backoff + extra
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

mod seconds {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| de::Error::custom(format!("invalid delay of {secs} seconds")))
    }
}

type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

/// Re-invokes an operation while it fails with a retryable error.
#[derive(Clone)]
pub struct RetryLayer {
    policy: RetryPolicy,
    sleeper: Sleeper,
}

impl fmt::Debug for RetryLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryLayer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryLayer {
    /// Creates a layer that sleeps the calling thread between attempts.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sleeper: Arc::new(thread::sleep),
        }
    }

    /// Replaces the function used to wait between attempts.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// The policy in force.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `call` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent.
    ///
    /// The returned error records the number of invocations performed.
    pub fn run<T>(
        &self,
        operation: &'static str,
        mut call: impl FnMut() -> ConnectorResult<T>,
    ) -> ConnectorResult<T> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match call() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err.with_attempts(attempt));
            }
            let delay = self.policy.delay_for_attempt(attempt - 1);
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                kind = %err.kind(),
                "retrying after transient failure"
            );
            (self.sleeper)(delay);
        }
    }
}
