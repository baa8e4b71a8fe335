//! Reachability probing subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator enters Probing
//!     → prober.rs (attempt, per-attempt timeout, fixed interval)
//!     → http.rs (GET the public validation URL)
//!     → 200 → reachable; anything else → log and try again
//! ```
//!
//! # Design Decisions
//! - Non-200 responses, transport errors and timeouts are all "not yet"
//! - No overall deadline here; the orchestrator owns that boundary
//! - The probe is a trait so tests can script endpoint behaviour

pub mod http;
pub mod prober;

use async_trait::async_trait;
use axum::http::Uri;
use std::time::Duration;
use thiserror::Error;

pub use self::http::HttpProbe;
pub use prober::ReachabilityProber;

/// Why a single probe attempt did not observe success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("unexpected status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

impl ProbeFailure {
    /// Metric label for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeFailure::Status(_) => "status",
            ProbeFailure::Transport(_) => "transport",
            ProbeFailure::Timeout(_) => "timeout",
        }
    }
}

/// One reachability check against a URL.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, url: &Uri) -> Result<(), ProbeFailure>;
}
