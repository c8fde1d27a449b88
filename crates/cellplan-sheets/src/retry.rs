//! Bounded exponential backoff for remote cell calls.
//!
//! [`with_retry`] re-runs an operation while it fails with a retryable
//! [`RemoteError`], sleeping `min(max_backoff, initial_delay * 2^(n-1))`
//! after the n-th failure (or the server's `Retry-After` hint, when one
//! was sent). Fatal errors and the error from the final attempt are
//! returned untouched.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::RemoteError;

/// Retry configuration for one logical remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// When false, exactly one attempt is made.
    pub enabled: bool,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

    /// Single attempt, fail fast.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delays(mut self, initial_delay: Duration, max_backoff: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_backoff = max_backoff;
        self
    }

    /// Number of attempts this policy allows. Never less than one.
    pub fn attempt_budget(&self) -> u32 {
        if self.enabled {
            self.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            max_backoff: Self::DEFAULT_MAX_BACKOFF,
        }
    }
}

/// Run `op` under `policy`.
///
/// `label` names the operation in log output (e.g. `"read _plan!A1"`).
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let budget = policy.attempt_budget();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "remote call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => {
                debug!(label, attempt, error = %err, "fatal remote error, not retrying");
                return Err(err);
            }
            Err(err) if attempt >= budget => {
                warn!(label, attempts = attempt, error = %err, "retry budget exhausted");
                return Err(err);
            }
            Err(err) => {
                let delay = err
                    .retry_after()
                    .unwrap_or_else(|| policy.delay_for_attempt(attempt));
                warn!(
                    label,
                    attempt,
                    max_attempts = budget,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient remote error, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
