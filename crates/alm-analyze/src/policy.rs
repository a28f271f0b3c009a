//! Fixed-delay retry policy with a cancellation stop signal.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use alm_config::RecoveryConfig;
use tokio_util::sync::CancellationToken;

/// How a retry loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: Option<E> },
    /// The stop token fired. Any in-flight attempt result was discarded.
    Stopped { attempts: u32 },
}

/// `max_attempts` tries, each preceded by `delay`. No backoff.
///
/// Time comes from `tokio::time`, so paused-clock tests run instantly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RecoveryConfig::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    #[must_use]
    pub const fn from_config(config: &RecoveryConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }

    /// Delay before the given (1-based) attempt.
    #[must_use]
    pub const fn delay_for(&self, _attempt: u32) -> Duration {
        self.delay
    }

    /// Run `attempt` until it succeeds, attempts run out, or `stop` fires.
    ///
    /// `stop` is checked after every suspension point: the delay, and the
    /// attempt itself.
    pub async fn run<T, E, F, Fut>(&self, stop: &CancellationToken, mut attempt: F) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut last_error = None;
        for n in 1..=self.max_attempts {
            let completed = n - 1;
            tokio::select! {
                biased;
                () = stop.cancelled() => return RetryOutcome::Stopped { attempts: completed },
                () = tokio::time::sleep(self.delay_for(n)) => {}
            }

            let result = tokio::select! {
                biased;
                () = stop.cancelled() => return RetryOutcome::Stopped { attempts: completed },
                result = attempt(n) => result,
            };
            if stop.is_cancelled() {
                return RetryOutcome::Stopped { attempts: n };
            }

            match result {
                Ok(value) => return RetryOutcome::Succeeded { value, attempts: n },
                Err(error) => {
                    tracing::debug!(attempt = n, max = self.max_attempts, %error, "attempt failed");
                    last_error = Some(error);
                }
            }
        }
        RetryOutcome::Exhausted {
            attempts: self.max_attempts,
            last_error,
        }
    }
}
