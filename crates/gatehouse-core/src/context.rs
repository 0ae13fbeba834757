//! Per-request context types.
//!
//! The [`RequestContext`] is created when a request enters the pipeline and
//! dropped once the response has been written. It is the only mutable state
//! threaded through the interceptor chain; nothing in it outlives the
//! request.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier tying together every log line and error body
/// produced for a single request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes correlation ids naturally sortable
/// in log storage. The id is rendered in simple (dash-free) form.
///
/// # Example
///
/// ```
/// use gatehouse_core::CorrelationId;
///
/// let id = CorrelationId::new();
/// assert_eq!(id.to_string().len(), 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Creates a new unique correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `CorrelationId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Per-request mutable context threaded through the interceptor chain.
///
/// The context is created at pipeline entry and carries:
///
/// - the [`CorrelationId`], generated once and immutable thereafter
/// - the monotonic entry timestamp, used only for duration computation
/// - the client address, for access logging
/// - free-form string attributes, written once per key by convention
/// - the authenticated principal, set only by the authentication gate
///
/// # Example
///
/// ```
/// use gatehouse_core::RequestContext;
///
/// let mut ctx = RequestContext::new(None);
/// ctx.set_attribute("route.target", "service-provider");
/// assert_eq!(ctx.attribute("route.target"), Some("service-provider"));
/// ```
#[derive(Debug)]
pub struct RequestContext {
    /// Correlation id, generated once at entry.
    correlation_id: CorrelationId,

    /// Monotonic timestamp captured at pipeline entry.
    received_at: Instant,

    /// Remote peer address, when known.
    remote_addr: Option<SocketAddr>,

    /// Free-form attributes shared between interceptors.
    attributes: HashMap<String, String>,

    /// Authenticated identity, absent until the auth gate passes.
    principal: Option<String>,
}

impl RequestContext {
    /// Creates a new context, stamping the entry instant and generating a
    /// fresh correlation id.
    #[must_use]
    pub fn new(remote_addr: Option<SocketAddr>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            received_at: Instant::now(),
            remote_addr,
            attributes: HashMap::new(),
            principal: None,
        }
    }

    /// Returns the correlation id.
    #[must_use]
    pub const fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Returns the monotonic instant the request entered the pipeline.
    #[must_use]
    pub const fn received_at(&self) -> Instant {
        self.received_at
    }

    /// Returns time elapsed since pipeline entry.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    /// Returns the client address, when the transport provided one.
    #[must_use]
    pub const fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the attribute stored under `key`, if any.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Stores an attribute. Keys are written once per request by
    /// convention; later interceptors only read them.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Returns the authenticated principal, if the auth gate has passed.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Sets the authenticated principal.
    ///
    /// This should only be called by the authentication gate.
    pub fn set_principal(&mut self, principal: impl Into<String>) {
        self.principal = Some(principal.into());
    }
}
