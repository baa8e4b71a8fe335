//! Snapshot of the rule list taken before the workflow touches anything.

use std::sync::Arc;

use thiserror::Error;

use crate::resource::{PathRule, ResourceRef, VersionStamp};
use crate::store::{ResourceStore, StoreError};

/// Immutable copy of RuleGroup[0]'s paths at capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    resource: ResourceRef,
    rules: Arc<[PathRule]>,
    captured_at: VersionStamp,
}

impl Snapshot {
    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    pub fn rules(&self) -> &[PathRule] {
        &self.rules
    }

    /// Version of the resource the snapshot was read from.
    pub fn captured_at(&self) -> &VersionStamp {
        &self.captured_at
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("reading {resource}: {source}")]
    Unavailable {
        resource: ResourceRef,
        #[source]
        source: StoreError,
    },

    #[error("{0} has no rule group")]
    MissingRuleGroup(ResourceRef),
}

/// Holds the one snapshot of a workflow run.
#[derive(Debug)]
pub struct SnapshotManager {
    target: ResourceRef,
    held: Option<Snapshot>,
}

impl SnapshotManager {
    pub fn new(target: ResourceRef) -> Self {
        Self { target, held: None }
    }

    /// Read the live resource and keep a copy of its first rule group.
    ///
    /// Later calls return the held snapshot without touching the store.
    pub async fn capture<S>(&mut self, store: &S) -> Result<Snapshot, SnapshotError>
    where
        S: ResourceStore + ?Sized,
    {
        if let Some(held) = &self.held {
            return Ok(held.clone());
        }

        tracing::info!(resource = %self.target, "Backing up the current ingress rules");

        let resource = store
            .get(&self.target)
            .await
            .map_err(|source| SnapshotError::Unavailable {
                resource: self.target.clone(),
                source,
            })?;
        let rules = resource
            .primary_paths()
            .ok_or_else(|| SnapshotError::MissingRuleGroup(self.target.clone()))?;

        let snapshot = Snapshot {
            resource: self.target.clone(),
            rules: Arc::from(rules),
            captured_at: resource.version.clone(),
        };

        tracing::debug!(
            resource = %self.target,
            rules = snapshot.len(),
            version = %snapshot.captured_at,
            "Snapshot captured"
        );

        self.held = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// The held snapshot, if captured.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.held.as_ref()
    }

    /// Drop the snapshot at the end of the run.
    pub fn release(&mut self) -> Option<Snapshot> {
        self.held.take()
    }
}
