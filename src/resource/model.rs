//! Routing resource data model.
//!
//! Transient copies of the externally owned ingress object. The store owns the
//! real resource; these values only live for one read-modify-write cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a routing resource inside the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Opaque optimistic-concurrency token assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionStamp(pub String);

impl VersionStamp {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VersionStamp {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Service port, either numeric or a named port on the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServicePort {
    Number(u16),
    Name(String),
}

impl fmt::Display for ServicePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServicePort::Number(n) => write!(f, "{}", n),
            ServicePort::Name(name) => f.write_str(name),
        }
    }
}

impl From<u16> for ServicePort {
    fn from(port: u16) -> Self {
        ServicePort::Number(port)
    }
}

/// Target service of a path rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Backend {
    pub service: String,
    pub port: ServicePort,
}

impl Backend {
    pub fn new(service: impl Into<String>, port: impl Into<ServicePort>) -> Self {
        Self {
            service: service.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.port)
    }
}

/// A single path-pattern-to-backend mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathRule {
    /// Store-defined pattern, opaque to the core.
    pub path: String,
    /// Store-defined match type (e.g. `Prefix`, `ImplementationSpecific`).
    pub path_type: Option<String>,
    pub backend: Backend,
}

impl PathRule {
    pub fn new(path: impl Into<String>, backend: Backend) -> Self {
        Self {
            path: path.into(),
            path_type: None,
            backend,
        }
    }

    pub fn with_path_type(mut self, path_type: impl Into<String>) -> Self {
        self.path_type = Some(path_type.into());
        self
    }
}

impl fmt::Display for PathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.path, self.backend)
    }
}

/// One ordered set of path rules, optionally scoped to a host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleGroup {
    pub host: Option<String>,
    pub paths: Vec<PathRule>,
}

/// A routing resource as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingResource {
    pub reference: ResourceRef,
    pub rule_groups: Vec<RuleGroup>,
    pub version: VersionStamp,
}

impl RoutingResource {
    /// Paths of the first rule group, the only group the workflow touches.
    pub fn primary_paths(&self) -> Option<&[PathRule]> {
        self.rule_groups.first().map(|g| g.paths.as_slice())
    }

    /// Replace the paths of the first rule group wholesale.
    ///
    /// Returns `false` when the resource has no rule group.
    pub fn replace_primary_paths(&mut self, paths: Vec<PathRule>) -> bool {
        match self.rule_groups.first_mut() {
            Some(group) => {
                group.paths = paths;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let rule = PathRule::new("/a", Backend::new("svc-a", 80));
        assert_eq!(rule.backend.to_string(), "svc-a:80");
        assert_eq!(rule.to_string(), "/a -> svc-a:80");
        assert_eq!(ResourceRef::new("default", "web").to_string(), "default/web");

        let named = Backend::new("svc-b", ServicePort::Name("http".into()));
        assert_eq!(named.to_string(), "svc-b:http");
    }

    #[test]
    fn test_replace_primary_paths_leaves_other_groups() {
        let mut resource = RoutingResource {
            reference: ResourceRef::new("default", "web"),
            rule_groups: vec![
                RuleGroup {
                    host: Some("a.example.com".into()),
                    paths: vec![PathRule::new("/a", Backend::new("svc-a", 80))],
                },
                RuleGroup {
                    host: Some("b.example.com".into()),
                    paths: vec![PathRule::new("/b", Backend::new("svc-b", 80))],
                },
            ],
            version: VersionStamp::from("1"),
        };

        assert!(resource.replace_primary_paths(Vec::new()));
        assert_eq!(resource.primary_paths(), Some(&[][..]));
        assert_eq!(resource.rule_groups[1].paths.len(), 1);
    }

    #[test]
    fn test_replace_primary_paths_without_groups() {
        let mut resource = RoutingResource {
            reference: ResourceRef::new("default", "web"),
            rule_groups: Vec::new(),
            version: VersionStamp::from("1"),
        };
        assert!(!resource.replace_primary_paths(Vec::new()));
        assert!(resource.primary_paths().is_none());
    }
}
