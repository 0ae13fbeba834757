//! # Gatehouse Core
//!
//! Core types for the Gatehouse edge gateway.
//!
//! This crate provides the foundational types shared by every other
//! Gatehouse crate:
//!
//! - [`RequestContext`] - Per-request mutable context carrying the
//!   correlation id, entry timestamp, attributes and principal
//! - [`CorrelationId`] - UUID v7 correlation identifier
//! - [`GatewayError`] - Terminal error taxonomy with envelope conversion
//! - [`Request`] / [`Response`] - HTTP type aliases used by the pipeline

#![forbid(unsafe_code)]

mod context;
mod error;
mod types;

pub use context::{CorrelationId, RequestContext};
pub use error::{GatewayError, GatewayResult};
pub use types::{envelope, Request, Response, ResponseExt};
