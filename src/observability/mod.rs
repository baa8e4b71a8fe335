//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator, writer and prober produce:
//!     → logging.rs (structured log events inside a per-run span)
//!     → metrics.rs (phase, store write and probe attempt counters)
//!
//! Consumers:
//!     → stderr
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Every log line of a run carries the run ID through the span
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
