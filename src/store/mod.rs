//! Resource store subsystem.
//!
//! # Data Flow
//! ```text
//! rollout (snapshot / writer)
//!     → ResourceStore::get     → RoutingResource + VersionStamp
//!     → ResourceStore::update  → new VersionStamp | Conflict | other error
//!
//! Implementations:
//!     kube.rs   → Kubernetes networking.k8s.io/v1 Ingress over HTTP
//!     memory.rs → in-process store with fault injection
//! ```
//!
//! # Design Decisions
//! - The core depends on the trait only, never on a transport
//! - Conflict is the single recoverable error; everything else is fatal upstream
//! - Updates always carry the version stamp from the caller's latest read

pub mod kube;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::resource::{ResourceRef, RoutingResource, VersionStamp};

pub use kube::KubeStore;
pub use memory::InMemoryStore;

/// Errors reported by a resource store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The supplied version stamp is stale.
    #[error("version conflict on {0}")]
    Conflict(ResourceRef),

    /// The resource does not exist.
    #[error("resource {0} not found")]
    NotFound(ResourceRef),

    /// The store could not be reached or answered unexpectedly.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (permissions, validation, ...).
    #[error("write rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The stored object cannot be represented by the routing model.
    #[error("malformed resource: {0}")]
    Malformed(String),
}

impl StoreError {
    /// True for the optimistic-concurrency failure that drives write retries.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Client contract for the external store holding routing resources.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Read the current resource, including its version stamp.
    async fn get(&self, target: &ResourceRef) -> Result<RoutingResource, StoreError>;

    /// Write `resource` if the stored version still equals `version`.
    async fn update(
        &self,
        target: &ResourceRef,
        resource: &RoutingResource,
        version: &VersionStamp,
    ) -> Result<VersionStamp, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Conflict(ResourceRef::new("default", "web"));
        assert_eq!(err.to_string(), "version conflict on default/web");
        assert!(err.is_conflict());

        let err = StoreError::Rejected {
            status: 403,
            message: "forbidden".into(),
        };
        assert!(err.to_string().contains("403"));
        assert!(!err.is_conflict());
    }
}
