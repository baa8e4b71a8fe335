//! Kubernetes Ingress store.
//!
//! # Responsibilities
//! - Read `networking.k8s.io/v1` Ingress objects from the API server
//! - Write rule changes back with the resourceVersion as a precondition
//! - Map HTTP 409 to a version conflict, everything else to fatal errors
//!
//! # Design Decisions
//! - Writes are JSON merge patches carrying `metadata.resourceVersion` and the
//!   complete `spec.rules` array, so unmodelled fields elsewhere survive
//! - Credentials are a bearer token file when present; no kubeconfig parsing
//! - The API server is always dialled directly, proxy variables are ignored

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::resource::{
    Backend, PathRule, ResourceRef, RoutingResource, RuleGroup, ServicePort, VersionStamp,
};
use crate::store::{ResourceStore, StoreError};

const MERGE_PATCH: &str = "application/merge-patch+json";

/// Ingress store backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: reqwest::Client,
    api_server: String,
    token: Option<String>,
}

impl KubeStore {
    /// Build a store from configuration, loading the token and CA bundle.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .no_proxy()
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify);

        if let Some(ca_path) = config.ca_path.as_deref().filter(|p| Path::new(p).exists()) {
            let pem = std::fs::read(ca_path)
                .map_err(|e| StoreError::Unavailable(format!("reading CA bundle {}: {}", ca_path, e)))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| StoreError::Unavailable(format!("parsing CA bundle {}: {}", ca_path, e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let token = match config.token_path.as_deref().filter(|p| Path::new(p).exists()) {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| StoreError::Unavailable(format!("reading token {}: {}", path, e)))?;
                Some(raw.trim().to_string())
            }
            None => None,
        };

        let client = builder
            .build()
            .map_err(|e| StoreError::Unavailable(format!("building API client: {}", e)))?;

        tracing::info!(
            api_server = %config.api_server,
            authenticated = token.is_some(),
            "Kubernetes store initialized"
        );

        Ok(Self {
            client,
            api_server: config.api_server.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn ingress_url(&self, target: &ResourceRef) -> String {
        format!(
            "{}/apis/networking.k8s.io/v1/namespaces/{}/ingresses/{}",
            self.api_server, target.namespace, target.name
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("api_server", &self.api_server)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get(&self, target: &ResourceRef) -> Result<RoutingResource, StoreError> {
        let response = self
            .authorize(self.client.get(self.ingress_url(target)))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("GET {}: {}", target, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(target.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Unavailable(format!(
                "GET {} returned {}: {}",
                target, status, body
            )));
        }

        let ingress: IngressWire = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(format!("decoding {}: {}", target, e)))?;
        ingress.into_resource(target)
    }

    async fn update(
        &self,
        target: &ResourceRef,
        resource: &RoutingResource,
        version: &VersionStamp,
    ) -> Result<VersionStamp, StoreError> {
        let patch = IngressPatch {
            metadata: PatchMetadata {
                resource_version: version.as_str(),
            },
            spec: PatchSpec {
                rules: resource.rule_groups.iter().map(RuleWire::from).collect(),
            },
        };
        let body = serde_json::to_vec(&patch)
            .map_err(|e| StoreError::Malformed(format!("encoding patch for {}: {}", target, e)))?;

        let response = self
            .authorize(self.client.patch(self.ingress_url(target)))
            .header(CONTENT_TYPE, MERGE_PATCH)
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("PATCH {}: {}", target, e)))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(StoreError::Conflict(target.clone()));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(target.clone()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let updated: IngressWire = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(format!("decoding update of {}: {}", target, e)))?;
        Ok(VersionStamp(updated.metadata.resource_version))
    }
}

#[derive(Debug, Deserialize)]
struct IngressWire {
    metadata: MetadataWire,
    #[serde(default)]
    spec: SpecWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataWire {
    #[serde(default)]
    resource_version: String,
}

#[derive(Debug, Default, Deserialize)]
struct SpecWire {
    #[serde(default)]
    rules: Vec<RuleWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http: Option<HttpWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HttpWire {
    #[serde(default)]
    paths: Vec<PathWire>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathWire {
    #[serde(default)]
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path_type: Option<String>,
    backend: BackendWire,
}

#[derive(Debug, Serialize, Deserialize)]
struct BackendWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service: Option<ServiceWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ServiceWire {
    name: String,
    port: PortWire,
}

#[derive(Debug, Serialize, Deserialize)]
struct PortWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    number: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize)]
struct IngressPatch<'a> {
    metadata: PatchMetadata<'a>,
    spec: PatchSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatchMetadata<'a> {
    resource_version: &'a str,
}

#[derive(Serialize)]
struct PatchSpec {
    rules: Vec<RuleWire>,
}

impl IngressWire {
    fn into_resource(self, target: &ResourceRef) -> Result<RoutingResource, StoreError> {
        if self.metadata.resource_version.is_empty() {
            return Err(StoreError::Malformed(format!(
                "{} has no resourceVersion",
                target
            )));
        }

        let rule_groups = self
            .spec
            .rules
            .into_iter()
            .map(|rule| rule.into_group(target))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RoutingResource {
            reference: target.clone(),
            rule_groups,
            version: VersionStamp(self.metadata.resource_version),
        })
    }
}

impl RuleWire {
    fn into_group(self, target: &ResourceRef) -> Result<RuleGroup, StoreError> {
        let paths = self
            .http
            .map(|http| http.paths)
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.into_rule(target))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleGroup {
            host: self.host,
            paths,
        })
    }
}

impl PathWire {
    fn into_rule(self, target: &ResourceRef) -> Result<PathRule, StoreError> {
        let service = self.backend.service.ok_or_else(|| {
            StoreError::Malformed(format!(
                "{}: path {} uses a non-service backend",
                target, self.path
            ))
        })?;
        let port = match (service.port.number, service.port.name) {
            (Some(number), _) => ServicePort::Number(number),
            (None, Some(name)) => ServicePort::Name(name),
            (None, None) => {
                return Err(StoreError::Malformed(format!(
                    "{}: path {} has no service port",
                    target, self.path
                )))
            }
        };
        Ok(PathRule {
            path: self.path,
            path_type: self.path_type,
            backend: Backend {
                service: service.name,
                port,
            },
        })
    }
}

impl From<&RuleGroup> for RuleWire {
    fn from(group: &RuleGroup) -> Self {
        let http = if group.paths.is_empty() {
            None
        } else {
            Some(HttpWire {
                paths: group.paths.iter().map(PathWire::from).collect(),
            })
        };
        Self {
            host: group.host.clone(),
            http,
        }
    }
}

impl From<&PathRule> for PathWire {
    fn from(rule: &PathRule) -> Self {
        let port = match &rule.backend.port {
            ServicePort::Number(n) => PortWire {
                number: Some(*n),
                name: None,
            },
            ServicePort::Name(name) => PortWire {
                number: None,
                name: Some(name.clone()),
            },
        };
        Self {
            path: rule.path.clone(),
            path_type: rule.path_type.clone(),
            backend: BackendWire {
                service: Some(ServiceWire {
                    name: rule.backend.service.clone(),
                    port,
                }),
            },
        }
    }
}
