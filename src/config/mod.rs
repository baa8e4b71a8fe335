//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → ChallengeConfig (validated, immutable for the run)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the run starts
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ChallengeConfig;
pub use schema::ConflictBackoffConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProbeConfig;
pub use schema::ResponderConfig;
pub use schema::StoreConfig;
pub use schema::TargetConfig;
pub use schema::WorkflowConfig;
