//! # Gatehouse Server
//!
//! The runnable edge gateway: HTTP listener, management endpoints,
//! telemetry initialization and the wiring that assembles the pipeline,
//! rule store and forwarder from configuration.

#![forbid(unsafe_code)]

mod management;
mod server;
pub mod telemetry;

pub use management::{Management, MANAGEMENT_PREFIX};
pub use server::{GatewayServer, ServerError};
