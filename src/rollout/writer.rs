//! Conflict-resilient writer.
//!
//! Converges RuleGroup[0] of the live resource to a desired list through
//! read-modify-write cycles, retrying every version conflict.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

use crate::observability::metrics;
use crate::resilience::{Backoff, ExponentialBackoff};
use crate::resource::{PathRule, ResourceRef, VersionStamp};
use crate::store::{ResourceStore, StoreError};

#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Re-fetching the resource failed.
    #[error("reading {resource}: {source}")]
    Unavailable {
        resource: ResourceRef,
        #[source]
        source: StoreError,
    },

    /// The store refused the write for a reason other than a conflict.
    #[error("writing {resource}: {source}")]
    Rejected {
        resource: ResourceRef,
        #[source]
        source: StoreError,
    },

    #[error("{0} has no rule group")]
    MissingRuleGroup(ResourceRef),
}

/// Outcome of a successful convergence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergeReport {
    /// Update attempts issued, including the accepted one.
    pub attempts: u32,
    /// Version stamp the store assigned to the accepted write.
    pub version: VersionStamp,
}

impl ConvergeReport {
    pub fn conflicts(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Applies desired rule lists under optimistic concurrency.
pub struct ConflictWriter<S: ?Sized> {
    store: Arc<S>,
    backoff: Arc<dyn Backoff>,
}

impl<S: ?Sized> Clone for ConflictWriter<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            backoff: self.backoff.clone(),
        }
    }
}

impl<S> ConflictWriter<S>
where
    S: ResourceStore + ?Sized,
{
    /// Writer with the default conflict backoff.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_backoff(store, ExponentialBackoff { base_ms: 100, max_ms: 2000 })
    }

    pub fn with_backoff(store: Arc<S>, backoff: impl Backoff + 'static) -> Self {
        Self {
            store,
            backoff: Arc::new(backoff),
        }
    }

    /// Make RuleGroup[0] of `target` equal `desired`.
    ///
    /// Returns only once a write carrying `desired` is accepted, or on the
    /// first error that is not a version conflict.
    pub async fn converge(
        &self,
        target: &ResourceRef,
        desired: &[PathRule],
    ) -> Result<ConvergeReport, ConvergeError> {
        let mut attempts = 0u32;

        loop {
            attempts = attempts.saturating_add(1);

            let mut resource = self
                .store
                .get(target)
                .await
                .map_err(|source| ConvergeError::Unavailable {
                    resource: target.clone(),
                    source,
                })?;
            let version = resource.version.clone();

            if !resource.replace_primary_paths(desired.to_vec()) {
                return Err(ConvergeError::MissingRuleGroup(target.clone()));
            }

            match self.store.update(target, &resource, &version).await {
                Ok(committed) => {
                    metrics::record_store_write("accepted");
                    tracing::debug!(
                        resource = %target,
                        attempts,
                        version = %committed,
                        "Write accepted"
                    );
                    return Ok(ConvergeReport {
                        attempts,
                        version: committed,
                    });
                }
                Err(e) if e.is_conflict() => {
                    metrics::record_store_write("conflict");
                    let delay = self.backoff.delay(attempts);
                    tracing::warn!(
                        resource = %target,
                        attempt = attempts,
                        delay = ?delay,
                        "Encountered conflict, retrying"
                    );
                    if delay > Duration::ZERO {
                        time::sleep(delay).await;
                    }
                }
                Err(source) => {
                    metrics::record_store_write("rejected");
                    return Err(ConvergeError::Rejected {
                        resource: target.clone(),
                        source,
                    });
                }
            }
        }
    }
}
