//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! Startup
//!     → server.rs Responder::bind (port reserved before any mutation)
//! Orchestrator enters Probing
//!     → Responder::spawn (axum serve, 200 "Ok")
//! Orchestrator finishes
//!     → shutdown broadcast → graceful stop
//! ```

pub mod server;

pub use server::{Responder, ResponderHandle};
