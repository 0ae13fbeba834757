//! Terminal error taxonomy for the gateway.
//!
//! Every rejection path in the pipeline maps to one [`GatewayError`]
//! variant, and every variant converts to exactly one envelope response.
//! No error crosses an interceptor boundary uncaught: the interceptor that
//! detects a terminal condition converts it to a response immediately.

use crate::context::CorrelationId;
use crate::types::{envelope, Response};
use http::StatusCode;
use thiserror::Error;

/// Result type alias using [`GatewayError`].
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Terminal conditions a request can hit inside the pipeline.
///
/// Credential validation failures are deliberately collapsed into a single
/// message: the gate does not tell callers whether a token was expired,
/// malformed or carried a bad signature.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No `Authorization` header, or an empty value.
    #[error("authentication token not provided")]
    MissingCredentials,

    /// The header was present but did not carry the expected scheme.
    #[error("invalid token format")]
    MalformedCredentials,

    /// Signature, expiry or claims check failed. Uniform on purpose.
    #[error("token validation failed or expired")]
    TokenRejected,

    /// An admission rule's window is exhausted.
    #[error("too many requests, please retry later")]
    AdmissionExceeded,

    /// No route rule matched the request path.
    #[error("no route matched the request path")]
    RouteNotFound,

    /// Every instance of the target service is unavailable.
    #[error("upstream service unavailable")]
    UpstreamUnavailable,

    /// Unexpected fault inside an interceptor.
    #[error("internal gateway error, correlation id {correlation_id}")]
    Internal {
        /// Correlation id of the failed request, for operator lookup.
        correlation_id: CorrelationId,
    },
}

impl GatewayError {
    /// Returns the HTTP status code for this terminal condition.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredentials | Self::MalformedCredentials | Self::TokenRejected => {
                StatusCode::UNAUTHORIZED
            }
            Self::AdmissionExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts the error into its envelope response.
    #[must_use]
    pub fn into_response(self) -> Response {
        envelope::reject(self.status_code(), &self.to_string())
    }
}
