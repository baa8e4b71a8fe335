//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required target fields present
//! - Value ranges (intervals > 0, ports valid, backoff base <= max)
//! - URLs and bind addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ChallengeConfig → Result<(), Vec<ValidationError>>
//! - Runs before any cluster resource is touched

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ChallengeConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ChallengeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let target = &config.target;
    for (field, value) in [
        ("target.namespace", &target.namespace),
        ("target.ingress", &target.ingress),
        ("target.service_name", &target.service_name),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }
    if target.service_port == 0 {
        errors.push(ValidationError::new("target.service_port", "must be non-zero"));
    }
    if target.domain.trim().is_empty() && config.probe.url.is_none() {
        errors.push(ValidationError::new(
            "target.domain",
            "required unless probe.url is set",
        ));
    }

    if Url::parse(&config.store.api_server).is_err() {
        errors.push(ValidationError::new(
            "store.api_server",
            format!("invalid URL '{}'", config.store.api_server),
        ));
    }
    if config.store.request_timeout_secs == 0 {
        errors.push(ValidationError::new("store.request_timeout_secs", "must be > 0"));
    }

    let backoff = &config.conflict_backoff;
    if backoff.base_delay_ms > backoff.max_delay_ms {
        errors.push(ValidationError::new(
            "conflict_backoff.base_delay_ms",
            "must not exceed max_delay_ms",
        ));
    }

    let probe_url = config.probe_url();
    match Url::parse(&probe_url) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::new(
            "probe.url",
            format!("scheme '{}' unsupported, use http", url.scheme()),
        )),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new(
            "probe.url",
            format!("invalid URL '{}': {}", probe_url, e),
        )),
    }
    if !config.probe.path.starts_with('/') {
        errors.push(ValidationError::new("probe.path", "must start with '/'"));
    }
    if config.probe.interval_secs == 0 {
        errors.push(ValidationError::new("probe.interval_secs", "must be > 0"));
    }
    if config.probe.timeout_secs == 0 {
        errors.push(ValidationError::new("probe.timeout_secs", "must be > 0"));
    }
    if config.probe.max_attempts == Some(0) {
        errors.push(ValidationError::new("probe.max_attempts", "must be > 0 when set"));
    }

    if config.responder.enabled {
        let bind = config.responder_bind_address();
        if bind.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "responder.bind_address",
                format!("invalid socket address '{}'", bind),
            ));
        }
        if let Some(path) = &config.responder.path {
            if !path.starts_with('/') {
                errors.push(ValidationError::new("responder.path", "must start with '/'"));
            } else if path
                .chars()
                .any(|c| matches!(c, '{' | '}' | '*' | '?' | '#') || c.is_whitespace())
            {
                errors.push(ValidationError::new(
                    "responder.path",
                    format!("'{}' must be a literal path without patterns or query", path),
                ));
            }
        }
    }

    if config.workflow.probe_deadline_secs == Some(0) {
        errors.push(ValidationError::new(
            "workflow.probe_deadline_secs",
            "must be > 0 when set",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ChallengeConfig {
        let mut config = ChallengeConfig::default();
        config.target.ingress = "web".into();
        config.target.service_name = "acme-responder".into();
        config.target.service_port = 8080;
        config.target.domain = "example.com".into();
        config
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let errors = validate_config(&ChallengeConfig::default()).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();

        assert!(fields.contains(&"target.ingress"));
        assert!(fields.contains(&"target.service_name"));
        assert!(fields.contains(&"target.service_port"));
        assert!(fields.contains(&"target.domain"));
    }

    #[test]
    fn test_rejects_https_probe_and_bad_ranges() {
        let mut config = valid();
        config.probe.url = Some("https://example.com/.well-known/ping".into());
        config.probe.interval_secs = 0;
        config.conflict_backoff.base_delay_ms = 5000;
        config.workflow.probe_deadline_secs = Some(0);

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "conflict_backoff.base_delay_ms",
                "probe.url",
                "probe.interval_secs",
                "workflow.probe_deadline_secs",
            ]
        );
    }

    #[test]
    fn test_probe_url_replaces_domain() {
        let mut config = valid();
        config.target.domain.clear();
        config.probe.url = Some("http://127.0.0.1:8080/.well-known/ping".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_pattern_syntax_in_responder_path() {
        for path in ["/.well-known/{token", "/.well-known/*rest", "/ping?x=1"] {
            let mut config = valid();
            config.responder.path = Some(path.into());
            let errors = validate_config(&config).unwrap_err();
            assert_eq!(errors.len(), 1, "path {}", path);
            assert_eq!(errors[0].field, "responder.path");
        }

        let mut config = valid();
        config.responder.path = Some("/.well-known/ping".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::new("probe.path", "must start with '/'");
        assert_eq!(err.to_string(), "probe.path: must start with '/'");
    }
}
