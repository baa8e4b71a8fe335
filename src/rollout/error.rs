//! Fatal workflow errors.
//!
//! Version conflicts and probe failures never surface here; they are absorbed
//! by the writer and prober retry loops.

use thiserror::Error;

use crate::resource::ResourceRef;
use crate::rollout::orchestrator::Phase;
use crate::rollout::snapshot::SnapshotError;
use crate::rollout::writer::ConvergeError;
use crate::store::StoreError;

/// Error that aborts a run. Carries the phase and resource for the operator.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{phase}: store unavailable for {resource}: {source}")]
    StoreUnavailable {
        phase: Phase,
        resource: ResourceRef,
        #[source]
        source: StoreError,
    },

    #[error("{phase}: write to {resource} rejected: {source}")]
    WriteRejected {
        phase: Phase,
        resource: ResourceRef,
        #[source]
        source: StoreError,
    },

    #[error("{phase}: {resource} has no rule group to modify")]
    MissingRuleGroup { phase: Phase, resource: ResourceRef },
}

impl WorkflowError {
    pub fn phase(&self) -> Phase {
        match self {
            WorkflowError::StoreUnavailable { phase, .. }
            | WorkflowError::WriteRejected { phase, .. }
            | WorkflowError::MissingRuleGroup { phase, .. } => *phase,
        }
    }

    pub fn resource(&self) -> &ResourceRef {
        match self {
            WorkflowError::StoreUnavailable { resource, .. }
            | WorkflowError::WriteRejected { resource, .. }
            | WorkflowError::MissingRuleGroup { resource, .. } => resource,
        }
    }

    /// True when the temporary rule may still be present in the live resource.
    ///
    /// An activation write the store definitively refused never landed; one
    /// whose outcome was lost in transit may have.
    pub fn leaves_validation_rule(&self) -> bool {
        match self.phase() {
            Phase::Probing | Phase::Restoring => true,
            Phase::Activating => matches!(
                self,
                WorkflowError::WriteRejected {
                    source: StoreError::Unavailable(_) | StoreError::Malformed(_),
                    ..
                }
            ),
            _ => false,
        }
    }

    pub(crate) fn from_snapshot(phase: Phase, error: SnapshotError) -> Self {
        match error {
            SnapshotError::Unavailable { resource, source } => WorkflowError::StoreUnavailable {
                phase,
                resource,
                source,
            },
            SnapshotError::MissingRuleGroup(resource) => {
                WorkflowError::MissingRuleGroup { phase, resource }
            }
        }
    }

    pub(crate) fn from_converge(phase: Phase, error: ConvergeError) -> Self {
        match error {
            ConvergeError::Unavailable { resource, source } => WorkflowError::StoreUnavailable {
                phase,
                resource,
                source,
            },
            ConvergeError::Rejected { resource, source } => WorkflowError::WriteRejected {
                phase,
                resource,
                source,
            },
            ConvergeError::MissingRuleGroup(resource) => {
                WorkflowError::MissingRuleGroup { phase, resource }
            }
        }
    }
}
