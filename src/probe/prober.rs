//! Poll loop until the validation path is reachable.

use std::time::Duration;

use axum::http::Uri;
use tokio::time;

use crate::config::ProbeConfig;
use crate::observability::metrics;
use crate::probe::{Probe, ProbeFailure};

/// Repeats a [`Probe`] on a fixed interval until it succeeds.
pub struct ReachabilityProber<P> {
    probe: P,
    interval: Duration,
    attempt_timeout: Duration,
    max_attempts: Option<u32>,
}

impl<P: Probe> ReachabilityProber<P> {
    pub fn new(probe: P, interval: Duration, attempt_timeout: Duration) -> Self {
        Self {
            probe,
            interval,
            attempt_timeout,
            max_attempts: None,
        }
    }

    pub fn from_config(probe: P, config: &ProbeConfig) -> Self {
        Self::new(
            probe,
            Duration::from_secs(config.interval_secs),
            Duration::from_secs(config.timeout_secs),
        )
        .with_max_attempts(config.max_attempts)
    }

    /// Give up after `max` failed attempts. `None` polls forever.
    pub fn with_max_attempts(mut self, max: Option<u32>) -> Self {
        self.max_attempts = max;
        self
    }

    /// Poll `url` until it answers 200.
    ///
    /// Returns `false` only when an attempt limit is configured and reached.
    pub async fn wait_until_reachable(&self, url: &Uri) -> bool {
        tracing::info!(url = %url, "Checking whether the validation path is reachable");

        let mut attempt = 0u32;
        loop {
            attempt = attempt.saturating_add(1);

            let outcome = match time::timeout(self.attempt_timeout, self.probe.check(url)).await {
                Ok(result) => result,
                Err(_) => Err(ProbeFailure::Timeout(self.attempt_timeout)),
            };

            match outcome {
                Ok(()) => {
                    metrics::record_probe_attempt("reachable");
                    tracing::info!(url = %url, attempt, "Validation path is reachable");
                    return true;
                }
                Err(ProbeFailure::Status(status)) => {
                    metrics::record_probe_attempt("status");
                    tracing::info!(url = %url, attempt, status, "Unreachable: unexpected status");
                }
                Err(failure) => {
                    metrics::record_probe_attempt(failure.kind());
                    tracing::warn!(url = %url, attempt, error = %failure, "Unreachable");
                }
            }

            if let Some(max) = self.max_attempts {
                if attempt >= max {
                    tracing::warn!(url = %url, attempts = attempt, "Giving up on reachability");
                    return false;
                }
            }

            time::sleep(self.interval).await;
        }
    }
}
