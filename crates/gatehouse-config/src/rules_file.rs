//! Rules file loading and built-in defaults.
//!
//! The rules file is JSON with three rule sections plus a static service
//! table:
//!
//! ```json
//! {
//!   "routes": [
//!     {"path_prefix": "/provider", "strip_prefix_segments": 1,
//!      "target_service": "service-provider"}
//!   ],
//!   "admission": [
//!     {"resource": "service-provider",
//!      "scope": {"type": "service", "service": "service-provider"},
//!      "window_secs": 1, "max_requests": 10}
//!   ],
//!   "auth_whitelist": ["/provider/auth/login"],
//!   "services": {
//!     "service-provider": ["http://127.0.0.1:8081"]
//!   }
//! }
//! ```
//!
//! Rule sections hot-reload; the service table is read once at startup.

use crate::error::ConfigError;
use gatehouse_proxy::{AdmissionRule, RouteRule, RuleScope, RuleSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// On-disk shape of the rules file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesFile {
    /// Route rules in priority order.
    #[serde(default)]
    pub routes: Vec<RouteRule>,

    /// Admission rules.
    #[serde(default)]
    pub admission: Vec<AdmissionRule>,

    /// Path prefixes exempt from authentication.
    #[serde(default)]
    pub auth_whitelist: Vec<String>,

    /// Static service table: logical name to instance base URLs.
    #[serde(default)]
    pub services: HashMap<String, Vec<String>>,
}

impl RulesFile {
    /// Reads and parses a rules file; the contained rule set is validated
    /// before being returned.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let file: Self = serde_json::from_str(&raw)?;
        file.rule_set().validate()?;
        Ok(file)
    }

    /// Returns the rule sections as a [`RuleSet`].
    #[must_use]
    pub fn rule_set(&self) -> RuleSet {
        RuleSet {
            routes: self.routes.clone(),
            admission: self.admission.clone(),
            auth_whitelist: self.auth_whitelist.clone(),
        }
    }
}

/// The built-in rule set used when no rules file is configured: two
/// routed services, per-service and per-API-group quotas, and a
/// whitelist covering login, registration and the health probe.
#[must_use]
pub fn default_rules() -> RulesFile {
    RulesFile {
        routes: vec![
            RouteRule {
                path_prefix: "/provider".to_string(),
                strip_prefix_segments: 1,
                target_service: "service-provider".to_string(),
            },
            RouteRule {
                path_prefix: "/consumer".to_string(),
                strip_prefix_segments: 1,
                target_service: "service-consumer".to_string(),
            },
        ],
        admission: vec![
            AdmissionRule {
                resource: "service-provider".to_string(),
                scope: RuleScope::Service {
                    service: "service-provider".to_string(),
                },
                window_secs: 1,
                max_requests: 10,
            },
            AdmissionRule {
                resource: "service-consumer".to_string(),
                scope: RuleScope::Service {
                    service: "service-consumer".to_string(),
                },
                window_secs: 1,
                max_requests: 10,
            },
            AdmissionRule {
                resource: "auth_api".to_string(),
                scope: RuleScope::ApiGroup {
                    prefixes: vec!["/provider/auth".to_string(), "/consumer/user".to_string()],
                },
                window_secs: 1,
                max_requests: 5,
            },
            AdmissionRule {
                resource: "provider_api".to_string(),
                scope: RuleScope::ApiGroup {
                    prefixes: vec!["/provider".to_string()],
                },
                window_secs: 1,
                max_requests: 20,
            },
            AdmissionRule {
                resource: "consumer_api".to_string(),
                scope: RuleScope::ApiGroup {
                    prefixes: vec!["/consumer".to_string()],
                },
                window_secs: 1,
                max_requests: 20,
            },
        ],
        auth_whitelist: vec![
            "/provider/auth/login".to_string(),
            "/provider/auth/register".to_string(),
            "/consumer/user/login".to_string(),
            "/consumer/user/register".to_string(),
            "/actuator/health".to_string(),
        ],
        services: HashMap::from([
            (
                "service-provider".to_string(),
                vec!["http://127.0.0.1:8081".to_string()],
            ),
            (
                "service-consumer".to_string(),
                vec!["http://127.0.0.1:8082".to_string()],
            ),
        ]),
    }
}
