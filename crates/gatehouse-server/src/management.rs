//! Management endpoints.
//!
//! Served directly by the listener, outside the interceptor pipeline:
//! operators need them to answer even when admission windows are
//! exhausted or the rule set is broken.

use bytes::Bytes;
use gatehouse_core::{Response, ResponseExt};
use gatehouse_pipeline::{Pipeline, StatisticsAggregator};
use http::{Method, StatusCode};
use http_body_util::Full;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Path prefix reserved for management endpoints.
pub const MANAGEMENT_PREFIX: &str = "/gateway";

/// State backing the management endpoints.
pub struct Management {
    pipeline: Arc<Pipeline>,
    statistics: Arc<StatisticsAggregator>,
    metrics: Option<PrometheusHandle>,
    started_at: Instant,
}

impl Management {
    /// Creates the management surface.
    #[must_use]
    pub fn new(
        pipeline: Arc<Pipeline>,
        statistics: Arc<StatisticsAggregator>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            pipeline,
            statistics,
            metrics,
            started_at: Instant::now(),
        }
    }

    /// Dispatches a management request, or returns `None` when the path
    /// is not a management path and belongs to the pipeline.
    #[must_use]
    pub fn dispatch(&self, method: &Method, path: &str) -> Option<Response> {
        if !gatehouse_proxy::prefix_matches(path, MANAGEMENT_PREFIX) {
            return None;
        }
        if method != Method::GET {
            return Some(Response::empty(StatusCode::METHOD_NOT_ALLOWED));
        }

        match path {
            "/gateway/health" => Some(self.health()),
            "/gateway/info" => Some(self.info()),
            "/gateway/statistics" => Some(self.statistics()),
            "/gateway/metrics" => Some(self.metrics()),
            _ => Some(Response::empty(StatusCode::NOT_FOUND)),
        }
    }

    fn health(&self) -> Response {
        Response::json(StatusCode::OK, &serde_json::json!({"status": "UP"}))
    }

    fn info(&self) -> Response {
        let body = serde_json::json!({
            "name": "gatehouse",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "stages": self.pipeline.stage_names(),
        });
        Response::json(StatusCode::OK, &body)
    }

    fn statistics(&self) -> Response {
        let body = serde_json::json!({
            "total": self.statistics.total_recorded(),
            "groups": self.statistics.snapshot(),
        });
        Response::json(StatusCode::OK, &body)
    }

    fn metrics(&self) -> Response {
        self.metrics.as_ref().map_or_else(
            || Response::empty(StatusCode::NOT_FOUND),
            |handle| {
                let mut response = http::Response::new(Full::new(Bytes::from(handle.render())));
                *response.status_mut() = StatusCode::OK;
                response.headers_mut().insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            },
        )
    }
}
