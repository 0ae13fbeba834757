//! CORS preflight short-circuit and response headers.

use crate::interceptor::{BoxFuture, Interceptor, Next};
use gatehouse_core::{Request, RequestContext, Response, ResponseExt};
use http::{HeaderValue, Method, StatusCode};

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "authorization, content-type, x-requested-with";
const EXPOSE_HEADERS: &str = "x-user-name";
const MAX_AGE: &str = "3600";

fn apply_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        "access-control-allow-origin",
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        "access-control-expose-headers",
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
    headers.insert("access-control-max-age", HeaderValue::from_static(MAX_AGE));
}

/// Answers `OPTIONS` preflights immediately and stamps CORS headers on
/// every other response.
///
/// Preflights never reach authentication or admission: browsers send them
/// without credentials, so rejecting them would break legitimate
/// cross-origin callers.
#[derive(Debug, Default)]
pub struct CorsShortCircuit;

impl CorsShortCircuit {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for CorsShortCircuit {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn order(&self) -> i32 {
        super::CORS_ORDER
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if request.method() == Method::OPTIONS {
                let mut response = Response::empty(StatusCode::OK);
                apply_cors_headers(&mut response);
                return response;
            }

            let mut response = next.run(ctx, request).await;
            apply_cors_headers(&mut response);
            response
        })
    }
}
