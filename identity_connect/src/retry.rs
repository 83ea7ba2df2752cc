use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

/// Backoff for calls to a remote identity.
///
/// The default allows exactly one retry: a failed delivery invalidates the
/// cached remote key and tries once more with a freshly fetched key.
///
/// # Example
///
/// ```
/// use identity_connect::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy {
///     max_retries: 3,
///     initial_delay: Duration::from_millis(100),
///     multiplier: 2.0,
///     max_delay: Duration::from_secs(1),
/// };
///
/// assert_eq!(policy.attempts(), 4);
/// assert_eq!(policy.delay_before(2), Some(Duration::from_millis(200)));
/// ```
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Calls made after the first one failed
    pub max_retries: u32,
    /// Wait before the first retry
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub initial_delay: Duration,
    /// Growth of the wait from one retry to the next
    pub multiplier: f64,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay: Duration::from_millis(250),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Retry `max_retries` times without waiting in between
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Total number of attempts, the first one included
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Wait before `attempt`, counted from zero. The first attempt goes out
    /// at once; past the last retry there is no attempt left.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        match attempt {
            0 => Some(Duration::ZERO),
            n if n > self.max_retries => None,
            n => {
                let growth = self.multiplier.powi(n.saturating_sub(1).min(i32::MAX as u32) as i32);
                let secs = (self.initial_delay.as_secs_f64() * growth).min(self.max_delay.as_secs_f64());

                Some(Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay))
            }
        }
    }

    /// Sleep for the backoff of `attempt`
    pub async fn wait(&self, attempt: u32) {
        if let Some(delay) = self.delay_before(attempt).filter(|delay| !delay.is_zero()) {
            tracing::trace!(attempt, ?delay, "backing off");
            tokio::time::sleep(delay).await;
        }
    }
}
