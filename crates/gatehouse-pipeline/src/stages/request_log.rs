//! Entry access logging.

use crate::interceptor::{BoxFuture, Interceptor, Next};
use gatehouse_core::{Request, RequestContext, Response};
use tracing::info;

/// Logs one line per accepted request, before authentication runs, so
/// even rejected requests leave an entry trace tied to the correlation
/// id.
#[derive(Debug, Default)]
pub struct RequestLog;

impl RequestLog {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for RequestLog {
    fn name(&self) -> &'static str {
        "request_log"
    }

    fn order(&self) -> i32 {
        super::REQUEST_LOG_ORDER
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let remote = ctx
                .remote_addr()
                .map_or_else(|| "unknown".to_string(), |addr| addr.to_string());
            info!(
                correlation_id = %ctx.correlation_id(),
                method = %request.method(),
                uri = %request.uri(),
                %remote,
                "request received"
            );
            metrics::counter!("gatehouse_requests_total").increment(1);
            next.run(ctx, request).await
        })
    }
}
