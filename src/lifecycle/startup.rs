//! Startup wiring.
//!
//! # Responsibilities
//! - Build the store client from validated configuration
//! - Bind the responder port before any resource is modified
//! - Assemble prober and orchestrator
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and leaves the cluster untouched
//! - Subsystems initialize in order, not concurrently

use std::sync::Arc;
use std::time::Duration;

use axum::http::Uri;
use thiserror::Error;

use crate::config::ChallengeConfig;
use crate::http::Responder;
use crate::lifecycle::Shutdown;
use crate::probe::{HttpProbe, ReachabilityProber};
use crate::resilience::ExponentialBackoff;
use crate::resource::{ResourceRef, ServicePort};
use crate::rollout::{ChallengeTarget, Orchestrator};
use crate::store::{KubeStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store client: {0}")]
    Store(#[from] StoreError),

    #[error("responder failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid probe URL '{url}': {reason}")]
    ProbeUrl { url: String, reason: String },
}

/// Challenge target described by `config`.
pub fn challenge_target(config: &ChallengeConfig) -> Result<ChallengeTarget, StartupError> {
    let url = config.probe_url();
    let probe_url = url.parse::<Uri>().map_err(|e| StartupError::ProbeUrl {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    Ok(ChallengeTarget {
        resource: ResourceRef::new(&config.target.namespace, &config.target.ingress),
        service_name: config.target.service_name.clone(),
        service_port: ServicePort::Number(config.target.service_port),
        probe_url,
    })
}

/// Build a ready-to-run orchestrator against the Kubernetes API.
pub async fn prepare(
    config: &ChallengeConfig,
    cancel: &Shutdown,
) -> Result<Orchestrator<KubeStore, HttpProbe>, StartupError> {
    let target = challenge_target(config)?;
    let store = Arc::new(KubeStore::new(&config.store)?);
    let prober = ReachabilityProber::from_config(HttpProbe::new(), &config.probe);

    let mut orchestrator = Orchestrator::new(store, prober, target)
        .with_backoff(ExponentialBackoff::from(&config.conflict_backoff))
        .with_probe_deadline(config.workflow.probe_deadline_secs.map(Duration::from_secs))
        .with_cancellation(cancel);

    if config.responder.enabled {
        let addr = config.responder_bind_address();
        let responder = Responder::bind(&addr, &config.responder)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;
        orchestrator = orchestrator.with_responder(responder);
    }

    tracing::info!(
        run_id = %orchestrator.run_id(),
        resource = %format!("{}/{}", config.target.namespace, config.target.ingress),
        probe_url = %config.probe_url(),
        "Workflow prepared"
    );

    Ok(orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChallengeConfig {
        let mut config = ChallengeConfig::default();
        config.target.namespace = "shop".into();
        config.target.ingress = "storefront".into();
        config.target.service_name = "acme-responder".into();
        config.target.service_port = 8080;
        config.target.domain = "shop.example.com".into();
        config.store.api_server = "http://127.0.0.1:1".into();
        config.store.token_path = None;
        config.store.ca_path = None;
        config.responder.bind_address = Some("127.0.0.1:0".into());
        config
    }

    #[test]
    fn test_challenge_target() {
        let target = challenge_target(&config()).unwrap();
        assert_eq!(target.resource, ResourceRef::new("shop", "storefront"));
        assert_eq!(target.service_port, ServicePort::Number(8080));
        assert_eq!(
            target.probe_url.to_string(),
            "http://shop.example.com/.well-known/ping"
        );
    }

    #[tokio::test]
    async fn test_prepare_binds_responder() {
        let orchestrator = prepare(&config(), &Shutdown::new()).await.unwrap();
        assert_eq!(orchestrator.phase(), crate::rollout::Phase::Idle);
    }

    #[tokio::test]
    async fn test_prepare_fails_on_port_clash() {
        let holder = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config();
        config.responder.bind_address = Some(holder.local_addr().unwrap().to_string());

        let err = prepare(&config, &Shutdown::new()).await.err().unwrap();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
