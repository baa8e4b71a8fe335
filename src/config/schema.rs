//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a challenge
//! run. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for a challenge run.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Which ingress to modify and where the validation backend lives.
    pub target: TargetConfig,

    /// Cluster API access.
    pub store: StoreConfig,

    /// Backoff between write attempts that hit a version conflict.
    pub conflict_backoff: ConflictBackoffConfig,

    /// Reachability probe settings.
    pub probe: ProbeConfig,

    /// Ephemeral responder settings.
    pub responder: ResponderConfig,

    /// Workflow-level bounds.
    pub workflow: WorkflowConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ChallengeConfig {
    /// URL the prober polls: the explicit override, or the domain plus probe path.
    pub fn probe_url(&self) -> String {
        match &self.probe.url {
            Some(url) => url.clone(),
            None => format!("http://{}{}", self.target.domain, self.probe.path),
        }
    }

    /// Address the responder binds: the explicit override, or every
    /// interface on the validation service port.
    pub fn responder_bind_address(&self) -> String {
        match &self.responder.bind_address {
            Some(addr) => addr.clone(),
            None => format!("0.0.0.0:{}", self.target.service_port),
        }
    }
}

/// The resource to modify and the validation backend to route to.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Namespace of the ingress.
    pub namespace: String,

    /// Name of the ingress object to alter.
    pub ingress: String,

    /// Service the validation rule points at.
    pub service_name: String,

    /// Port of that service.
    pub service_port: u16,

    /// Domain whose control is being proven.
    pub domain: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            ingress: String::new(),
            service_name: String::new(),
            service_port: 0,
            domain: String::new(),
        }
    }
}

/// Kubernetes API access.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// API server base URL (e.g. "https://kubernetes.default.svc").
    pub api_server: String,

    /// Bearer token file; ignored when absent on disk.
    pub token_path: Option<String>,

    /// CA bundle (PEM) for the API server; ignored when absent on disk.
    pub ca_path: Option<String>,

    /// Skip TLS verification of the API server.
    pub insecure_skip_tls_verify: bool,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_server: "https://kubernetes.default.svc".to_string(),
            token_path: Some("/var/run/secrets/kubernetes.io/serviceaccount/token".to_string()),
            ca_path: Some("/var/run/secrets/kubernetes.io/serviceaccount/ca.crt".to_string()),
            insecure_skip_tls_verify: false,
            request_timeout_secs: 10,
        }
    }
}

/// Backoff between conflicting writes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConflictBackoffConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ConflictBackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Reachability probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Full probe URL; overrides `http://<domain><path>`.
    pub url: Option<String>,

    /// Path probed on the domain.
    pub path: String,

    /// Delay between attempts in seconds.
    pub interval_secs: u64,

    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Give up after this many failed attempts (unbounded when unset).
    pub max_attempts: Option<u32>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: "/.well-known/ping".to_string(),
            interval_secs: 10,
            timeout_secs: 5,
            max_attempts: None,
        }
    }
}

/// Ephemeral responder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Run the built-in responder.
    pub enabled: bool,

    /// Bind address; defaults to "0.0.0.0:<service_port>".
    pub bind_address: Option<String>,

    /// Only answer this path; every path when unset.
    pub path: Option<String>,

    /// Response body.
    pub body: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: None,
            path: None,
            body: "Ok".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Workflow-level bounds.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Force the restore this many seconds after probing starts.
    pub probe_deadline_secs: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Colored log output.
    pub ansi: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ansi: true,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
