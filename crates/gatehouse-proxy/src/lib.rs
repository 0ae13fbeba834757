//! # Gatehouse Proxy
//!
//! Routing and forwarding for the Gatehouse edge gateway.
//!
//! This crate owns everything between "a request was admitted" and "a
//! backend answered":
//!
//! - [`RouteRule`] / [`AdmissionRule`] / [`RuleSet`] - the immutable rule
//!   model loaded from configuration
//! - [`RuleStore`] - atomically swappable snapshot holder for hot reload
//! - [`InstanceRegistry`] - the read-only seam to the external service
//!   registry, with a [`StaticRegistry`] default
//! - [`RoundRobinBalancer`] - instance selection
//! - [`Forwarder`] - the terminal that relays a request to one healthy
//!   instance and propagates the backend response unchanged

#![forbid(unsafe_code)]

mod balancer;
mod forwarder;
mod registry;
mod rules;
mod store;

pub use balancer::RoundRobinBalancer;
pub use forwarder::{Forwarder, HOP_BY_HOP_HEADERS, IDENTITY_HEADER};
pub use registry::{InstanceRegistry, StaticRegistry};
pub use rules::{prefix_matches, AdmissionRule, RouteRule, RuleError, RuleScope, RuleSet};
pub use store::RuleStore;
