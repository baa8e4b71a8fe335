//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Store client → Bind responder → Prober → Orchestrator
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancellation broadcast → orchestrator skips to Restoring
//!
//! Shutdown (shutdown.rs):
//!     Broadcast used both for cancellation and for stopping the responder
//! ```
//!
//! # Design Decisions
//! - Fail fast: anything that can fail before the ingress is touched does
//! - Signals never interrupt a restore in progress

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{prepare, StartupError};
