//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ChallengeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a configuration file without validating it.
///
/// CLI overrides are applied on top before [`validate_config`] runs.
pub fn read_config(path: &Path) -> Result<ChallengeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ChallengeConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ChallengeConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [target]
        namespace = "shop"
        ingress = "storefront"
        service_name = "acme-responder"
        service_port = 8080
        domain = "shop.example.com"

        [probe]
        interval_secs = 3
        max_attempts = 20

        [workflow]
        probe_deadline_secs = 600
    "#;

    #[test]
    fn test_parse_partial_config() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.target.namespace, "shop");
        assert_eq!(config.target.service_port, 8080);
        assert_eq!(config.probe.interval_secs, 3);
        assert_eq!(config.probe.timeout_secs, 5);
        assert_eq!(config.probe.max_attempts, Some(20));
        assert_eq!(config.workflow.probe_deadline_secs, Some(600));
        assert_eq!(config.conflict_backoff.base_delay_ms, 100);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[target\nnamespace = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/challenge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
