//! In-process resource store.
//!
//! Enforces the same version discipline as a real API server and lets callers
//! inject the failures the workflow has to survive: concurrent commits,
//! unreachable reads and rejected writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::resource::{PathRule, ResourceRef, RoutingResource, RuleGroup, VersionStamp};
use crate::store::{ResourceStore, StoreError};

#[derive(Debug)]
struct Entry {
    rule_groups: Vec<RuleGroup>,
    version: u64,
}

/// Resource store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<ResourceRef, Entry>>,
    pending_conflicts: AtomicU32,
    reads_fail: AtomicBool,
    write_rejection: Mutex<Option<StoreError>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a resource. The version restarts at 1.
    pub fn insert(&self, target: ResourceRef, rule_groups: Vec<RuleGroup>) {
        if let Ok(mut entries) = self.entries() {
            entries.insert(target, Entry { rule_groups, version: 1 });
        }
    }

    /// Simulate a third-party commit replacing the first rule group's paths.
    pub fn overwrite_rules(&self, target: &ResourceRef, paths: Vec<PathRule>) {
        if let Ok(mut entries) = self.entries() {
            if let Some(entry) = entries.get_mut(target) {
                match entry.rule_groups.first_mut() {
                    Some(group) => group.paths = paths,
                    None => entry.rule_groups.push(RuleGroup { host: None, paths }),
                }
                entry.version += 1;
            }
        }
    }

    /// Make the next `n` updates fail with a conflict, each one preceded by a
    /// simulated concurrent commit that bumps the stored version.
    pub fn inject_conflicts(&self, n: u32) {
        self.pending_conflicts.store(n, Ordering::SeqCst);
    }

    /// Make every read fail with [`StoreError::Unavailable`].
    pub fn fail_reads(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    /// Make every update fail with `error` until cleared with `None`.
    pub fn reject_writes(&self, error: Option<StoreError>) {
        if let Ok(mut rejection) = self.write_rejection.lock() {
            *rejection = error;
        }
    }

    /// Current paths of the first rule group.
    pub fn primary_paths(&self, target: &ResourceRef) -> Option<Vec<PathRule>> {
        let entries = self.entries().ok()?;
        entries
            .get(target)
            .and_then(|e| e.rule_groups.first())
            .map(|g| g.paths.clone())
    }

    /// All rule groups of a resource.
    pub fn rule_groups(&self, target: &ResourceRef) -> Option<Vec<RuleGroup>> {
        let entries = self.entries().ok()?;
        entries.get(target).map(|e| e.rule_groups.clone())
    }

    /// Number of `get` calls served (including failed ones).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `update` calls received (including failed ones).
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<ResourceRef, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn take_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get(&self, target: &ResourceRef) -> Result<RoutingResource, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }

        let entries = self.entries()?;
        let entry = entries
            .get(target)
            .ok_or_else(|| StoreError::NotFound(target.clone()))?;

        Ok(RoutingResource {
            reference: target.clone(),
            rule_groups: entry.rule_groups.clone(),
            version: VersionStamp(entry.version.to_string()),
        })
    }

    async fn update(
        &self,
        target: &ResourceRef,
        resource: &RoutingResource,
        version: &VersionStamp,
    ) -> Result<VersionStamp, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let rejection = self
            .write_rejection
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?
            .clone();
        if let Some(error) = rejection {
            return Err(error);
        }

        let mut entries = self.entries()?;
        let entry = entries
            .get_mut(target)
            .ok_or_else(|| StoreError::NotFound(target.clone()))?;

        if self.take_conflict() {
            entry.version += 1;
            return Err(StoreError::Conflict(target.clone()));
        }

        if entry.version.to_string() != version.as_str() {
            return Err(StoreError::Conflict(target.clone()));
        }

        entry.rule_groups = resource.rule_groups.clone();
        entry.version += 1;
        Ok(VersionStamp(entry.version.to_string()))
    }
}
