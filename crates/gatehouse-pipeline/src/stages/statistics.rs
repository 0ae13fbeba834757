//! Statistics tracking stage.

use crate::interceptor::{BoxFuture, Interceptor, Next};
use crate::stats::StatisticsAggregator;
use gatehouse_core::{Request, RequestContext, Response};
use std::sync::Arc;

/// Records one outcome per request in the shared aggregator, keyed by the
/// full request path.
///
/// The completion guard is armed before the downstream runs, so a request
/// that panics or is cancelled mid-flight is still recorded, as
/// abandoned.
pub struct StatisticsStage {
    aggregator: Arc<StatisticsAggregator>,
}

impl StatisticsStage {
    /// Creates the stage over the shared aggregator.
    #[must_use]
    pub fn new(aggregator: Arc<StatisticsAggregator>) -> Self {
        Self { aggregator }
    }
}

impl Interceptor for StatisticsStage {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn order(&self) -> i32 {
        super::STATISTICS_ORDER
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let mut guard = self.aggregator.track(request.uri().path());
            let response = next.run(ctx, request).await;
            guard.finish(response.status().as_u16());
            response
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

    fn request(path: &str) -> Request {
        http::Request::builder()
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn distinct_paths_get_distinct_entries() {
        let aggregator = Arc::new(StatisticsAggregator::new());
        let stage = StatisticsStage::new(aggregator.clone());
        let mut ctx = RequestContext::new(None);

        for path in ["/provider/order/list", "/provider/account/get"] {
            let next = Next::terminal(|_ctx, _req| {
                Box::pin(async { Response::empty(StatusCode::OK) })
            });
            stage.handle(&mut ctx, request(path), next).await;
        }

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["/provider/order/list"].success, 1);
        assert_eq!(snapshot["/provider/account/get"].success, 1);
    }

    #[tokio::test]
    async fn error_outcomes_are_bucketed_under_the_path() {
        let aggregator = Arc::new(StatisticsAggregator::new());
        let stage = StatisticsStage::new(aggregator.clone());
        let mut ctx = RequestContext::new(None);

        let next = Next::terminal(|_ctx, _req| {
            Box::pin(async { Response::empty(StatusCode::NOT_FOUND) })
        });
        stage.handle(&mut ctx, request("/nowhere"), next).await;

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot["/nowhere"].client_error, 1);
    }

    #[tokio::test]
    async fn cancelled_downstream_counts_as_abandoned() {
        let aggregator = Arc::new(StatisticsAggregator::new());
        let stage = StatisticsStage::new(aggregator.clone());
        let mut ctx = RequestContext::new(None);

        let next = Next::terminal(|_ctx, _req| {
            Box::pin(async {
                std::future::pending::<()>().await;
                unreachable!()
            })
        });

        let fut = stage.handle(&mut ctx, request("/provider/order/list"), next);
        // Poll once, then drop mid-flight.
        tokio::select! {
            _ = fut => panic!("downstream never completes"),
            () = tokio::task::yield_now() => {}
        }

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot["/provider/order/list"].abandoned, 1);
    }
}
