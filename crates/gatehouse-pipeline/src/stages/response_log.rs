//! Completion logging and slow-request detection.

use crate::interceptor::{BoxFuture, Interceptor, Next};
use gatehouse_core::{Request, RequestContext, Response};
use std::time::Duration;
use tracing::{error, info, warn};

const SLOW_THRESHOLD: Duration = Duration::from_secs(1);
const VERY_SLOW_THRESHOLD: Duration = Duration::from_secs(3);

/// Logs the response status and total handling time, escalating to a
/// warning when the request was slow.
#[derive(Debug, Default)]
pub struct ResponseLog;

impl ResponseLog {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for ResponseLog {
    fn name(&self) -> &'static str {
        "response_log"
    }

    fn order(&self) -> i32 {
        super::RESPONSE_LOG_ORDER
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let path = request.uri().path().to_string();
            let response = next.run(ctx, request).await;

            let elapsed = ctx.elapsed();
            let correlation_id = ctx.correlation_id();
            let status = response.status().as_u16();

            if status >= 500 {
                error!(%correlation_id, %path, status, ?elapsed, "request failed upstream");
            } else if status >= 400 {
                warn!(%correlation_id, %path, status, ?elapsed, "request rejected");
            } else if elapsed >= VERY_SLOW_THRESHOLD {
                warn!(%correlation_id, %path, status, ?elapsed, "very slow request");
            } else if elapsed >= SLOW_THRESHOLD {
                warn!(%correlation_id, %path, status, ?elapsed, "slow request");
            } else {
                info!(%correlation_id, %path, status, ?elapsed, "request completed");
            }
            metrics::histogram!("gatehouse_request_duration_seconds")
                .record(elapsed.as_secs_f64());

            response
        })
    }
}
