//! Built-in pipeline stages.
//!
//! The execution order is fixed by these constants; the pipeline sorts
//! ascending, so cors runs first on the request path and last on the
//! response path. Gaps between values leave room for deployment-specific
//! stages without renumbering.

mod admission;
mod auth;
mod cors;
mod request_log;
mod response_log;
mod statistics;

pub use admission::AdmissionControl;
pub use auth::{AuthGate, TokenVerifier};
pub use cors::CorsShortCircuit;
pub use request_log::RequestLog;
pub use response_log::ResponseLog;
pub use statistics::StatisticsStage;

/// Order of the CORS preflight short-circuit.
pub const CORS_ORDER: i32 = -300;

/// Order of entry access logging.
pub const REQUEST_LOG_ORDER: i32 = -200;

/// Order of the authentication gate.
pub const AUTH_ORDER: i32 = -100;

/// Order of fixed-window admission control.
pub const ADMISSION_ORDER: i32 = -50;

/// Order of statistics tracking.
pub const STATISTICS_ORDER: i32 = 0;

/// Order of completion logging and slow-request detection.
pub const RESPONSE_LOG_ORDER: i32 = 100;
