//! The rule model: routes, admission rules and the auth whitelist.
//!
//! A [`RuleSet`] is built once (from configuration or the built-in
//! defaults), validated, and then never mutated. Hot reload replaces the
//! whole set atomically via [`RuleStore`](crate::RuleStore); no request
//! ever observes a half-updated set.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating a rule set.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A path prefix was empty or did not start with `/`.
    #[error("invalid path prefix {0:?}: prefixes must start with '/'")]
    InvalidPrefix(String),

    /// Two route rules declared the same prefix.
    #[error("duplicate route prefix {0:?}")]
    DuplicateRoutePrefix(String),

    /// An admission rule declared a zero quota.
    #[error("admission rule {0:?}: max_requests must be greater than zero")]
    ZeroQuota(String),

    /// An admission rule declared a zero-length window.
    #[error("admission rule {0:?}: window_secs must be greater than zero")]
    ZeroWindow(String),

    /// An admission rule declared duplicate resource ids.
    #[error("duplicate admission resource {0:?}")]
    DuplicateResource(String),
}

/// A single route: prefix match, segment strip, target service.
///
/// Routes are consulted in declared order; the first full prefix match
/// wins, so more specific prefixes must be declared first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Path prefix this route claims, e.g. `/provider`.
    pub path_prefix: String,

    /// Number of leading path segments removed before forwarding.
    /// `/provider/order/list` with strip 1 is relayed as `/order/list`.
    #[serde(default)]
    pub strip_prefix_segments: usize,

    /// Logical service name resolved through the instance registry.
    pub target_service: String,
}

/// What a quota applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleScope {
    /// Applies when the matched route targets this service.
    Service {
        /// Target service name, matching [`RouteRule::target_service`].
        service: String,
    },

    /// Applies when the request path matches any of these prefixes,
    /// independent of routing.
    ApiGroup {
        /// Path prefixes forming the logical API group.
        prefixes: Vec<String>,
    },
}

/// One fixed-window quota for a protected resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRule {
    /// Unique resource id; also the key of the live window cell.
    pub resource: String,

    /// What this quota applies to.
    pub scope: RuleScope,

    /// Length of the counting window in seconds.
    pub window_secs: u64,

    /// Maximum admitted requests per window.
    pub max_requests: u64,
}

/// An immutable, validated snapshot of every rule the pipeline consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Route rules in priority order.
    #[serde(default)]
    pub routes: Vec<RouteRule>,

    /// Admission rules.
    #[serde(default)]
    pub admission: Vec<AdmissionRule>,

    /// Path prefixes exempt from authentication.
    #[serde(default)]
    pub auth_whitelist: Vec<String>,
}

/// Boundary-aware prefix match.
///
/// `/provider` matches `/provider` and `/provider/order`, but not
/// `/providers`. A trailing slash on the prefix is tolerated.
#[must_use]
pub fn prefix_matches(path: &str, prefix: &str) -> bool {
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl RouteRule {
    /// Returns the upstream path after stripping the configured number of
    /// leading segments. Always starts with `/`.
    #[must_use]
    pub fn upstream_path<'a>(&self, path: &'a str) -> std::borrow::Cow<'a, str> {
        if self.strip_prefix_segments == 0 {
            return std::borrow::Cow::Borrowed(path);
        }
        let mut rest = path;
        for _ in 0..self.strip_prefix_segments {
            rest = rest.trim_start_matches('/');
            rest = match rest.find('/') {
                Some(idx) => &rest[idx..],
                None => "",
            };
        }
        if rest.is_empty() {
            std::borrow::Cow::Borrowed("/")
        } else {
            std::borrow::Cow::Owned(rest.to_string())
        }
    }
}

impl RuleSet {
    /// An empty rule set. Matches nothing, admits everything, exempts
    /// nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            routes: Vec::new(),
            admission: Vec::new(),
            auth_whitelist: Vec::new(),
        }
    }

    /// Validates the whole set. Called before a set is installed; an
    /// invalid set is never activated.
    pub fn validate(&self) -> Result<(), RuleError> {
        let mut seen_prefixes = std::collections::HashSet::new();
        for route in &self.routes {
            if !route.path_prefix.starts_with('/') {
                return Err(RuleError::InvalidPrefix(route.path_prefix.clone()));
            }
            if !seen_prefixes.insert(route.path_prefix.trim_end_matches('/').to_string()) {
                return Err(RuleError::DuplicateRoutePrefix(route.path_prefix.clone()));
            }
        }

        let mut seen_resources = std::collections::HashSet::new();
        for rule in &self.admission {
            if rule.max_requests == 0 {
                return Err(RuleError::ZeroQuota(rule.resource.clone()));
            }
            if rule.window_secs == 0 {
                return Err(RuleError::ZeroWindow(rule.resource.clone()));
            }
            if let RuleScope::ApiGroup { prefixes } = &rule.scope {
                for prefix in prefixes {
                    if !prefix.starts_with('/') {
                        return Err(RuleError::InvalidPrefix(prefix.clone()));
                    }
                }
            }
            if !seen_resources.insert(rule.resource.clone()) {
                return Err(RuleError::DuplicateResource(rule.resource.clone()));
            }
        }

        for prefix in &self.auth_whitelist {
            if !prefix.starts_with('/') {
                return Err(RuleError::InvalidPrefix(prefix.clone()));
            }
        }

        Ok(())
    }

    /// Returns the first route whose prefix fully matches `path`.
    #[must_use]
    pub fn match_route(&self, path: &str) -> Option<&RouteRule> {
        self.routes
            .iter()
            .find(|route| prefix_matches(path, &route.path_prefix))
    }

    /// Returns every admission rule applicable to `path`, in declared
    /// order. Route-scoped rules apply through the matched route's target
    /// service; api-group rules apply by prefix.
    #[must_use]
    pub fn admission_rules_for(&self, path: &str) -> Vec<&AdmissionRule> {
        let matched_service = self.match_route(path).map(|r| r.target_service.as_str());
        self.admission
            .iter()
            .filter(|rule| match &rule.scope {
                RuleScope::Service { service } => matched_service == Some(service.as_str()),
                RuleScope::ApiGroup { prefixes } => {
                    prefixes.iter().any(|p| prefix_matches(path, p))
                }
            })
            .collect()
    }

    /// Whether `path` is exempt from authentication.
    #[must_use]
    pub fn is_whitelisted(&self, path: &str) -> bool {
        self.auth_whitelist.iter().any(|p| prefix_matches(path, p))
    }
}
