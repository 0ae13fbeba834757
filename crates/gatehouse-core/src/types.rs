//! HTTP types used throughout the pipeline.
//!
//! Request and response bodies are fully buffered (`Full<Bytes>`); the
//! gateway relays small JSON payloads and the single suspension point is
//! the upstream dispatch, not body streaming.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

/// The HTTP request type flowing through the interceptor chain.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced by interceptors and the forwarder.
pub type Response = http::Response<Full<Bytes>>;

/// Builders for the fixed rejection envelope.
///
/// Every terminal rejection the gateway produces has the same JSON shape:
///
/// ```json
/// {"code": 429, "message": "...", "data": null, "timestamp": 1735689600000}
/// ```
///
/// The `timestamp` is wall-clock epoch millis; the `code` mirrors the HTTP
/// status code of the response.
pub mod envelope {
    use super::{Bytes, Full, Response, StatusCode};

    /// Builds a rejection response with the standard envelope body.
    #[must_use]
    pub fn reject(status: StatusCode, message: &str) -> Response {
        let body = serde_json::json!({
            "code": status.as_u16(),
            "message": message,
            "data": null,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        });

        let mut response = http::Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// Extension trait for building plain responses.
pub trait ResponseExt {
    /// Creates an empty response with the given status code.
    fn empty(status: StatusCode) -> Response;

    /// Creates a JSON response from a serializable value.
    fn json(status: StatusCode, value: &serde_json::Value) -> Response;
}

impl ResponseExt for Response {
    fn empty(status: StatusCode) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }

    fn json(status: StatusCode, value: &serde_json::Value) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(value.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }
}
