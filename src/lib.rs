//! Ingress challenge library.
//!
//! Temporarily routes `/.well-known/*` on an ingress to a validation
//! service, waits until the path answers from outside, and puts the original
//! rules back.

// Core workflow
pub mod resource;
pub mod rollout;
pub mod store;

// Verification
pub mod http;
pub mod probe;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ChallengeConfig;
pub use lifecycle::Shutdown;
pub use rollout::{Orchestrator, ProbeVerdict, RunReport, WorkflowError};
