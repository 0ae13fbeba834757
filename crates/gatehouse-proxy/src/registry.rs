//! Read-only seam to the external service registry.
//!
//! Gatehouse never registers or deregisters instances itself; it only
//! asks "which instances of this service are healthy right now". The
//! trait keeps the forwarder testable and leaves room for a real registry
//! client behind the same interface.

use std::collections::HashMap;

/// Resolves a logical service name to its healthy instance base URLs.
pub trait InstanceRegistry: Send + Sync {
    /// Returns every healthy instance of `service`, as base URLs without
    /// a trailing slash (e.g. `http://10.0.0.3:8080`). An unknown service
    /// yields an empty list.
    fn healthy_instances(&self, service: &str) -> Vec<String>;
}

/// A fixed service-to-instances table, the default when no external
/// registry is wired in.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    services: HashMap<String, Vec<String>>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the instance list for a service, replacing any previous
    /// entry. Trailing slashes are trimmed so URL joining stays uniform.
    #[must_use]
    pub fn with_service<S, I>(mut self, service: S, instances: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let instances = instances
            .into_iter()
            .map(|i| i.into().trim_end_matches('/').to_string())
            .collect();
        self.services.insert(service.into(), instances);
        self
    }
}

impl InstanceRegistry for StaticRegistry {
    fn healthy_instances(&self, service: &str) -> Vec<String> {
        self.services.get(service).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_service_yields_empty_list() {
        let registry = StaticRegistry::new();
        assert!(registry.healthy_instances("nope").is_empty());
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let registry =
            StaticRegistry::new().with_service("svc", ["http://localhost:9001/"]);
        assert_eq!(
            registry.healthy_instances("svc"),
            vec!["http://localhost:9001".to_string()]
        );
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = StaticRegistry::new()
            .with_service("svc", ["http://a:1"])
            .with_service("svc", ["http://b:2"]);
        assert_eq!(
            registry.healthy_instances("svc"),
            vec!["http://b:2".to_string()]
        );
    }
}
