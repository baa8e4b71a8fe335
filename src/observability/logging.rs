//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level when set. A configured level
//! containing `=` is taken as a full filter directive.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(config.ansi)
                .with_writer(std::io::stderr),
        )
        .try_init();

    if let Err(e) = result {
        eprintln!("logging already initialized: {}", e);
    }
}

fn default_directives(level: &str) -> String {
    if level.contains('=') {
        level.to_string()
    } else {
        format!("ingress_challenge={level},tower_http={level}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_level_expands() {
        assert_eq!(
            default_directives("debug"),
            "ingress_challenge=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_directive_passthrough() {
        assert_eq!(default_directives("warn,hyper=info"), "warn,hyper=info");
    }
}
