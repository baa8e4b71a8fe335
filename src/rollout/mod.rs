//! Mutate / verify / rollback workflow.
//!
//! # Data Flow
//! ```text
//! Orchestrator (orchestrator.rs)
//!     Idle → Snapshotting: snapshot.rs captures RuleGroup[0] once
//!     Snapshotting → Activating: writer.rs converges to snapshot + validation rule
//!     Activating → Probing: responder serves, prober polls the public URL
//!     Probing → Restoring: writer.rs converges back to the snapshot
//!     Restoring → Done
//!     any → Fatal on store unavailability or a non-conflict write error
//! ```
//!
//! # Design Decisions
//! - Every write is read-modify-write with the freshly fetched version stamp
//! - Conflicts are retried without bound; the restore must land eventually
//! - Restore overwrites RuleGroup[0] wholesale, discarding concurrent edits
//!   made by other actors during the activation window
//! - Deadline and cancellation sit at the Probing boundary only

pub mod error;
pub mod orchestrator;
pub mod snapshot;
pub mod writer;

pub use error::WorkflowError;
pub use orchestrator::{ChallengeTarget, Orchestrator, Phase, ProbeVerdict, RunReport};
pub use snapshot::{Snapshot, SnapshotError, SnapshotManager};
pub use writer::{ConflictWriter, ConvergeError, ConvergeReport};
