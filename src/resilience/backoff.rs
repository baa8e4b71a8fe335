//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::ConflictBackoffConfig;

/// Delay policy between retry attempts.
pub trait Backoff: Send + Sync {
    /// Delay before retry number `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Exponential growth from `base_ms`, capped at `max_ms`, plus up to 10% jitter.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl From<&ConflictBackoffConfig> for ExponentialBackoff {
    fn from(config: &ConflictBackoffConfig) -> Self {
        Self {
            base_ms: config.base_delay_ms,
            max_ms: config.max_delay_ms,
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_ms, self.max_ms)
    }
}

/// Retry immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
