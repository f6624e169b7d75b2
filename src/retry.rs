//! Bounded retry for per-object upload attempts.
//!
//! Every failure during an attempt is treated as transient — network blips,
//! throttling, and local I/O all get the same bounded second chance — because
//! a publish run would rather spend three extra requests than fail a build on
//! a hiccup. The attempt ceiling is the only protection against a persistent
//! error, so exhaustion is reported with the attempts used.

use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Attempt ceiling and backoff shape for one object's upload.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per object, first try included.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per attempt thereafter.
    pub initial_backoff: Duration,
    /// Cap on any single backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Backoff to sleep after the `attempt`-th failure (1-based).
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Result of [`with_retry`]: the final result plus how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds or the policy's attempt ceiling is hit.
///
/// Failed attempts are logged at warn level with the object they belong to;
/// the caller decides what exhaustion means.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    object: &str,
    mut operation: F,
) -> Attempted<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(e) if attempt < policy.max_attempts => {
                let backoff = policy.backoff_duration(attempt);
                warn!(
                    object,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "upload attempt failed, retrying"
                );
                sleep(backoff).await;
            }
            Err(e) => {
                return Attempted {
                    result: Err(e),
                    attempts: attempt,
                };
            }
        }
    }
}
