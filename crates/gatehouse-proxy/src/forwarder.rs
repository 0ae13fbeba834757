//! Upstream relay.
//!
//! The forwarder is the pipeline's terminal: it matches the active route
//! set, resolves healthy instances, picks one round-robin and relays the
//! request, returning the backend response with status, headers and body
//! intact. Routing misses and empty instance lists produce envelope
//! rejections without ever contacting a backend.

use crate::balancer::RoundRobinBalancer;
use crate::registry::InstanceRegistry;
use crate::store::RuleStore;
use gatehouse_core::{CorrelationId, GatewayError, Request, Response};
use http::header::HeaderName;
use http::HeaderMap;
use http_body_util::{BodyExt, Full};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Header carrying the authenticated principal to backends.
pub const IDENTITY_HEADER: &str = "x-user-name";

/// Connection-scoped headers that must not cross the relay in either
/// direction.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| name.as_str().eq_ignore_ascii_case(h))
}

/// Relays admitted requests to one healthy backend instance.
#[derive(Clone)]
pub struct Forwarder {
    store: Arc<RuleStore>,
    registry: Arc<dyn InstanceRegistry>,
    balancer: Arc<RoundRobinBalancer>,
    client: reqwest::Client,
}

impl Forwarder {
    /// Creates a forwarder over the given rule store and registry.
    #[must_use]
    pub fn new(store: Arc<RuleStore>, registry: Arc<dyn InstanceRegistry>) -> Self {
        Self {
            store,
            registry,
            balancer: Arc::new(RoundRobinBalancer::new()),
            // Redirects are the caller's business; a proxy relays them.
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap_or_default(),
        }
    }

    /// Routes and relays one request. Always produces a response; routing
    /// and upstream failures are mapped to their envelope rejections.
    pub async fn dispatch(&self, correlation_id: CorrelationId, request: Request) -> Response {
        let rules = self.store.snapshot();
        let path = request.uri().path().to_string();

        let Some(route) = rules.match_route(&path) else {
            debug!(%correlation_id, %path, "no route matched");
            metrics::counter!("gatehouse_route_misses_total").increment(1);
            return GatewayError::RouteNotFound.into_response();
        };

        let service = route.target_service.clone();
        let instances = self.registry.healthy_instances(&service);
        let Some(instance) = self.balancer.pick(&service, &instances) else {
            warn!(%correlation_id, %service, "no healthy instances");
            metrics::counter!("gatehouse_upstream_unavailable_total", "service" => service)
                .increment(1);
            return GatewayError::UpstreamUnavailable.into_response();
        };

        let upstream_path = route.upstream_path(&path);
        let url = match request.uri().query() {
            Some(query) => format!("{instance}{upstream_path}?{query}"),
            None => format!("{instance}{upstream_path}"),
        };

        debug!(%correlation_id, %service, %url, "relaying upstream");
        let started = Instant::now();
        let response = self.relay(&url, request).await;
        metrics::histogram!("gatehouse_upstream_duration_seconds", "service" => service.clone())
            .record(started.elapsed().as_secs_f64());

        match response {
            Ok(response) => {
                metrics::counter!("gatehouse_upstream_requests_total", "service" => service)
                    .increment(1);
                response
            }
            Err(err) => {
                warn!(%correlation_id, %service, error = %err, "upstream relay failed");
                metrics::counter!("gatehouse_upstream_errors_total", "service" => service)
                    .increment(1);
                GatewayError::UpstreamUnavailable.into_response()
            }
        }
    }

    async fn relay(&self, url: &str, request: Request) -> Result<Response, reqwest::Error> {
        let (parts, body) = request.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map(http_body_util::Collected::to_bytes)
            .unwrap_or_default();

        let mut headers = HeaderMap::new();
        for (name, value) in &parts.headers {
            if is_hop_by_hop(name)
                || name == http::header::HOST
                || name == http::header::CONTENT_LENGTH
            {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body_bytes)
            .send()
            .await?;

        let status = upstream.status();
        let response_headers = upstream.headers().clone();
        let response_body = upstream.bytes().await?;

        let mut response = Response::new(Full::new(response_body));
        *response.status_mut() = status;
        for (name, value) in &response_headers {
            if is_hop_by_hop(name) || name == http::header::CONTENT_LENGTH {
                continue;
            }
            response.headers_mut().append(name.clone(), value.clone());
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use crate::rules::{RouteRule, RuleSet};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    fn forwarder_with(routes: Vec<RouteRule>, registry: StaticRegistry) -> Forwarder {
        let set = RuleSet {
            routes,
            admission: Vec::new(),
            auth_whitelist: Vec::new(),
        };
        let store = Arc::new(RuleStore::new(set).unwrap());
        Forwarder::new(store, Arc::new(registry))
    }

    fn get(path: &str) -> Request {
        http::Request::builder()
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn unmatched_path_is_rejected_without_backend_contact() {
        let forwarder = forwarder_with(Vec::new(), StaticRegistry::new());
        let response = forwarder
            .dispatch(CorrelationId::new(), get("/nowhere"))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_instance_list_yields_service_unavailable() {
        let routes = vec![RouteRule {
            path_prefix: "/provider".to_string(),
            strip_prefix_segments: 1,
            target_service: "service-provider".to_string(),
        }];
        let forwarder = forwarder_with(routes, StaticRegistry::new());
        let response = forwarder
            .dispatch(CorrelationId::new(), get("/provider/order/list"))
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn hop_by_hop_headers_are_recognised_case_insensitively() {
        assert!(is_hop_by_hop(&HeaderName::from_static("connection")));
        assert!(is_hop_by_hop(&HeaderName::from_static("transfer-encoding")));
        assert!(!is_hop_by_hop(&HeaderName::from_static("content-type")));
        assert!(!is_hop_by_hop(&HeaderName::from_static("x-user-name")));
    }
}
