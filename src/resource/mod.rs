//! Routing resource subsystem.
//!
//! # Data Flow
//! ```text
//! Resource store (get)
//!     → model.rs (RoutingResource with rule groups and a version stamp)
//!     → rollout snapshot (copy of RuleGroup[0] paths)
//!     → mutator.rs (snapshot + validation rule)
//!     → resource store (update with the fetched version stamp)
//! ```
//!
//! # Design Decisions
//! - The core only ever edits RuleGroup[0]; other groups pass through untouched
//! - Path patterns are opaque strings compared by equality only
//! - Version stamps are opaque and never synthesised locally

pub mod model;
pub mod mutator;

pub use model::{
    Backend, PathRule, ResourceRef, RoutingResource, RuleGroup, ServicePort, VersionStamp,
};
pub use mutator::{add_validation_rule, VALIDATION_PATH, VALIDATION_PATH_TYPE};
