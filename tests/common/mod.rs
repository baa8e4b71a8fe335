//! Shared fixtures for workflow tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::Uri;

use ingress_challenge::probe::{Probe, ProbeFailure, ReachabilityProber};
use ingress_challenge::resource::{Backend, PathRule, ResourceRef, RuleGroup, ServicePort};
use ingress_challenge::rollout::ChallengeTarget;
use ingress_challenge::store::InMemoryStore;

pub const VALIDATION_SERVICE: &str = "svc-validate";
pub const VALIDATION_PORT: u16 = 8080;

pub fn resource() -> ResourceRef {
    ResourceRef::new("shop", "storefront")
}

pub fn rule(path: &str, service: &str, port: u16) -> PathRule {
    PathRule::new(path, Backend::new(service, port)).with_path_type("Prefix")
}

pub fn target(probe_url: &str) -> ChallengeTarget {
    ChallengeTarget {
        resource: resource(),
        service_name: VALIDATION_SERVICE.to_string(),
        service_port: ServicePort::Number(VALIDATION_PORT),
        probe_url: probe_url.parse().unwrap(),
    }
}

/// Store holding `resource()` with a single rule group routing `paths`.
pub fn seeded_store(paths: Vec<PathRule>) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert(
        resource(),
        vec![RuleGroup {
            host: Some("shop.example.com".into()),
            paths,
        }],
    );
    store
}

/// Prober with the production interval and timeout.
pub fn prober<P: Probe>(probe: P) -> ReachabilityProber<P> {
    ReachabilityProber::new(probe, Duration::from_secs(10), Duration::from_secs(5))
}

type Hook = Box<dyn Fn(u32) + Send + Sync>;

/// Probe that fails the first `failures` checks and then succeeds.
///
/// The hook sees the 1-based attempt number before the outcome is decided.
pub struct ScriptedProbe {
    failures: u32,
    calls: AtomicU32,
    hook: Option<Hook>,
}

impl ScriptedProbe {
    pub fn reachable_after(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            hook: None,
        }
    }

    pub fn never_reachable() -> Self {
        Self::reachable_after(u32::MAX)
    }

    pub fn with_hook(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn check(&self, _url: &Uri) -> Result<(), ProbeFailure> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = &self.hook {
            hook(attempt);
        }
        if attempt > self.failures {
            Ok(())
        } else {
            Err(ProbeFailure::Status(404))
        }
    }
}
