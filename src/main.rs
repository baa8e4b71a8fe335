//! Ingress challenge runner.
//!
//! ```text
//!   snapshot ──▶ add /.well-known/* ──▶ probe until 200 ──▶ restore snapshot
//!      │                │                      │                    │
//!      └── GET ingress  └── PATCH (retry on    ├── deadline         └── PATCH (retry on
//!                           409 conflicts)     └── SIGINT/SIGTERM       409 conflicts)
//! ```
//!
//! Exit status: 0 when the path was confirmed reachable and the ingress was
//! restored, 2 when it was restored without confirmation, 1 on any error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ingress_challenge::config::loader::{read_config, ConfigError};
use ingress_challenge::config::validation::validate_config;
use ingress_challenge::lifecycle::{signals, startup};
use ingress_challenge::observability::{logging, metrics};
use ingress_challenge::{ChallengeConfig, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "ingress-challenge")]
#[command(about = "Temporarily route /.well-known/* on an ingress and verify it from outside", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    namespace: Option<String>,

    /// Name of the ingress to modify
    #[arg(long)]
    ingress: Option<String>,

    /// Service that answers the validation path
    #[arg(long)]
    service_name: Option<String>,

    #[arg(long)]
    service_port: Option<u16>,

    /// Public domain probed from outside
    #[arg(long)]
    domain: Option<String>,

    #[arg(long)]
    api_server: Option<String>,

    /// Full probe URL, replaces domain and probe path
    #[arg(long)]
    probe_url: Option<String>,

    #[arg(long)]
    probe_interval_secs: Option<u64>,

    /// Stop probing after this many seconds and restore anyway
    #[arg(long)]
    deadline_secs: Option<u64>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut ChallengeConfig) {
        if let Some(v) = &self.namespace {
            config.target.namespace = v.clone();
        }
        if let Some(v) = &self.ingress {
            config.target.ingress = v.clone();
        }
        if let Some(v) = &self.service_name {
            config.target.service_name = v.clone();
        }
        if let Some(v) = self.service_port {
            config.target.service_port = v;
        }
        if let Some(v) = &self.domain {
            config.target.domain = v.clone();
        }
        if let Some(v) = &self.api_server {
            config.store.api_server = v.clone();
        }
        if let Some(v) = &self.probe_url {
            config.probe.url = Some(v.clone());
        }
        if let Some(v) = self.probe_interval_secs {
            config.probe.interval_secs = v;
        }
        if let Some(v) = self.deadline_secs {
            config.workflow.probe_deadline_secs = Some(v);
        }
        if let Some(v) = &self.log_level {
            config.observability.log_level = v.clone();
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<ChallengeConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ChallengeConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::from(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ingress-challenge starting");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let cancel = Shutdown::new();
    let orchestrator = match startup::prepare(&config, &cancel).await {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed, ingress untouched");
            return ExitCode::from(1);
        }
    };

    let signals = signals::forward_signals(cancel);
    let outcome = orchestrator.run().await;
    signals.abort();

    match outcome {
        Ok(report) if report.verdict.is_confirmed() => {
            tracing::info!(run_id = %report.run_id, "Validation path confirmed reachable");
            ExitCode::SUCCESS
        }
        Ok(report) => {
            tracing::warn!(
                run_id = %report.run_id,
                verdict = ?report.verdict,
                "Ingress restored without confirming reachability"
            );
            ExitCode::from(2)
        }
        Err(_) => ExitCode::from(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "ingress-challenge",
            "--ingress",
            "storefront",
            "--service-name",
            "acme-responder",
            "--service-port",
            "8089",
            "--domain",
            "shop.example.com",
            "--deadline-secs",
            "300",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.target.namespace, "default");
        assert_eq!(config.target.ingress, "storefront");
        assert_eq!(config.target.service_port, 8089);
        assert_eq!(config.workflow.probe_deadline_secs, Some(300));
        assert_eq!(config.probe_url(), "http://shop.example.com/.well-known/ping");
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let cli = Cli::try_parse_from(["ingress-challenge"]).unwrap();
        assert!(matches!(resolve_config(&cli), Err(ConfigError::Validation(_))));
    }
}
