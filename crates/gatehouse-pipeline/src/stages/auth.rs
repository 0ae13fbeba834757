//! The authentication gate.
//!
//! Every non-whitelisted request must carry a valid HS256 bearer token.
//! The three failure shapes are distinguishable to the caller only as far
//! as their message: missing header, malformed header, and a uniform
//! "validation failed" for everything the verifier rejects, so the gate
//! never reveals whether a token was expired or forged.

use crate::interceptor::{BoxFuture, Interceptor, Next};
use gatehouse_core::{GatewayError, Request, RequestContext, Response};
use gatehouse_proxy::{RuleStore, IDENTITY_HEADER};
use http::HeaderValue;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Validates HS256 bearer tokens and extracts the subject.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier over the shared secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verifies signature and expiry, returning the subject claim.
    pub fn verify(&self, token: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims.sub)
    }
}

/// Rejects unauthenticated requests before they consume admission quota.
pub struct AuthGate {
    verifier: TokenVerifier,
    store: Arc<RuleStore>,
}

impl AuthGate {
    /// Creates the gate over the given verifier and rule store; the
    /// whitelist comes from the active rule set at request time.
    #[must_use]
    pub fn new(verifier: TokenVerifier, store: Arc<RuleStore>) -> Self {
        Self { verifier, store }
    }

    fn authenticate(&self, request: &Request) -> Result<String, GatewayError> {
        let header = request
            .headers()
            .get(http::header::AUTHORIZATION)
            .ok_or(GatewayError::MissingCredentials)?;

        let value = header
            .to_str()
            .map_err(|_| GatewayError::MalformedCredentials)?;
        if value.trim().is_empty() {
            return Err(GatewayError::MissingCredentials);
        }

        let token = value
            .strip_prefix("Bearer ")
            .ok_or(GatewayError::MalformedCredentials)?
            .trim();
        if token.is_empty() {
            return Err(GatewayError::MalformedCredentials);
        }

        self.verifier.verify(token).map_err(|err| {
            debug!(error = %err, "token rejected");
            GatewayError::TokenRejected
        })
    }
}

impl Interceptor for AuthGate {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn order(&self) -> i32 {
        super::AUTH_ORDER
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            // Never trust a client-supplied identity header.
            request.headers_mut().remove(IDENTITY_HEADER);

            let rules = self.store.snapshot();
            if rules.is_whitelisted(request.uri().path()) {
                return next.run(ctx, request).await;
            }

            match self.authenticate(&request) {
                Ok(principal) => {
                    if let Ok(value) = HeaderValue::from_str(&principal) {
                        request.headers_mut().insert(IDENTITY_HEADER, value);
                    }
                    ctx.set_principal(&principal);
                    next.run(ctx, request).await
                }
                Err(err) => {
                    warn!(
                        correlation_id = %ctx.correlation_id(),
                        path = request.uri().path(),
                        reason = %err,
                        "request rejected by auth gate"
                    );
                    metrics::counter!("gatehouse_auth_rejections_total").increment(1);
                    err.into_response()
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use gatehouse_core::ResponseExt;
    use http::StatusCode;
    use http_body_util::Full;
    use jsonwebtoken::{EncodingKey, Header};
    use serde::Serialize;

    const SECRET: &str = "test-secret";

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        exp: usize,
    }

    fn token_for(subject: &str, exp_offset_secs: i64) -> String {
        let exp = usize::try_from(chrono::Utc::now().timestamp() + exp_offset_secs).unwrap();
        jsonwebtoken::encode(
            &Header::default(),
            &TestClaims {
                sub: subject.to_string(),
                exp,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn gate() -> AuthGate {
        let set = gatehouse_proxy::RuleSet {
            routes: Vec::new(),
            admission: Vec::new(),
            auth_whitelist: vec!["/provider/auth/login".to_string()],
        };
        AuthGate::new(
            TokenVerifier::new(SECRET),
            Arc::new(RuleStore::new(set).unwrap()),
        )
    }

    fn request(path: &str, auth_header: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri(path);
        if let Some(value) = auth_header {
            builder = builder.header(http::header::AUTHORIZATION, value);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    fn capture_identity<'a>(seen: Arc<std::sync::Mutex<Option<String>>>) -> Next<'a> {
        Next::terminal(move |_ctx, req: Request| {
            Box::pin(async move {
                *seen.lock().unwrap() = req
                    .headers()
                    .get(IDENTITY_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Response::empty(StatusCode::OK)
            })
        })
    }

    #[tokio::test]
    async fn valid_token_passes_and_propagates_identity() {
        let gate = gate();
        let mut ctx = RequestContext::new(None);
        let seen = Arc::new(std::sync::Mutex::new(None));

        let token = token_for("alice", 3600);
        let req = request("/provider/order/list", Some(&format!("Bearer {token}")));

        let response = gate
            .handle(&mut ctx, req, capture_identity(seen.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.principal(), Some("alice"));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let gate = gate();
        let mut ctx = RequestContext::new(None);
        let next = Next::terminal(|_ctx, _req| {
            Box::pin(async { panic!("must not reach downstream") })
        });

        let response = gate
            .handle(&mut ctx, request("/provider/order/list", None), next)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(ctx.principal().is_none());
    }

    #[tokio::test]
    async fn wrong_scheme_is_unauthorized() {
        let gate = gate();
        let mut ctx = RequestContext::new(None);
        let next = Next::terminal(|_ctx, _req| {
            Box::pin(async { panic!("must not reach downstream") })
        });

        let req = request("/provider/order/list", Some("Basic dXNlcjpwYXNz"));
        let response = gate.handle(&mut ctx, req, next).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let gate = gate();
        let mut ctx = RequestContext::new(None);
        let next = Next::terminal(|_ctx, _req| {
            Box::pin(async { panic!("must not reach downstream") })
        });

        let token = token_for("alice", -3600);
        let req = request("/provider/order/list", Some(&format!("Bearer {token}")));
        let response = gate.handle(&mut ctx, req, next).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn whitelisted_path_skips_the_gate() {
        let gate = gate();
        let mut ctx = RequestContext::new(None);
        let seen = Arc::new(std::sync::Mutex::new(None));

        let response = gate
            .handle(
                &mut ctx,
                request("/provider/auth/login", None),
                capture_identity(seen.clone()),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn client_supplied_identity_header_is_stripped() {
        let gate = gate();
        let mut ctx = RequestContext::new(None);
        let seen = Arc::new(std::sync::Mutex::new(None));

        let mut req = request("/provider/auth/login", None);
        req.headers_mut()
            .insert(IDENTITY_HEADER, HeaderValue::from_static("mallory"));

        let response = gate
            .handle(&mut ctx, req, capture_identity(seen.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(seen.lock().unwrap().is_none());
    }
}
