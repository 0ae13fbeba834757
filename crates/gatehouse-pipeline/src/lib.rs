//! # Gatehouse Pipeline
//!
//! Priority-ordered interceptor pipeline for the Gatehouse edge gateway.
//!
//! Requests flow through a chain of [`Interceptor`]s sorted once, at
//! startup, by ascending order value; ties keep registration order. Each
//! built-in stage owns one concern:
//!
//! | stage          | order | concern                                   |
//! |----------------|-------|-------------------------------------------|
//! | `cors`         | -300  | preflight short-circuit, CORS headers     |
//! | `request_log`  | -200  | entry access logging                      |
//! | `auth`         | -100  | bearer-token authentication gate          |
//! | `admission`    | -50   | fixed-window admission control            |
//! | `statistics`   | 0     | per-path outcome counting                 |
//! | `response_log` | 100   | completion logging, slow-request warnings |
//!
//! The terminal handler, supplied per request by the server, forwards to
//! the matched backend.

#![forbid(unsafe_code)]

mod interceptor;
mod limiter;
mod pipeline;
mod stats;
pub mod stages;

pub use interceptor::{BoxFuture, Interceptor, Next};
pub use limiter::FixedWindowLimiter;
pub use pipeline::{BoxedInterceptor, Pipeline, PipelineBuilder};
pub use stats::{CompletionGuard, GroupSnapshot, StatisticsAggregator};
