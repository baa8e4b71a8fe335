//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Store write hits a version conflict:
//!     → backoff.rs (delay before re-fetching and retrying)
//!     → rollout writer retries until accepted or a fatal error
//! ```
//!
//! # Design Decisions
//! - Conflict retries are unbounded; only the delay between them is shaped
//! - Backoff is a trait so tests can inject zero delay
//! - Jittered backoff prevents lock-step retries against concurrent writers

pub mod backoff;

pub use backoff::{Backoff, ExponentialBackoff, NoBackoff};
