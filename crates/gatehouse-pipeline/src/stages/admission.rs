//! Fixed-window admission control.

use crate::interceptor::{BoxFuture, Interceptor, Next};
use crate::limiter::FixedWindowLimiter;
use gatehouse_core::{GatewayError, Request, RequestContext, Response};
use gatehouse_proxy::RuleStore;
use std::sync::Arc;
use tracing::warn;

/// Applies every admission rule matching the request path; one exhausted
/// window rejects the request without consuming quota elsewhere.
///
/// Runs after authentication, so unauthenticated traffic can never drain
/// a window.
pub struct AdmissionControl {
    store: Arc<RuleStore>,
    limiter: Arc<FixedWindowLimiter>,
}

impl AdmissionControl {
    /// Creates the stage over the shared rule store and limiter.
    #[must_use]
    pub fn new(store: Arc<RuleStore>, limiter: Arc<FixedWindowLimiter>) -> Self {
        Self { store, limiter }
    }
}

impl Interceptor for AdmissionControl {
    fn name(&self) -> &'static str {
        "admission"
    }

    fn order(&self) -> i32 {
        super::ADMISSION_ORDER
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let rules = self.store.snapshot();
            let applicable = rules.admission_rules_for(request.uri().path());

            match self.limiter.try_admit(&applicable) {
                Ok(()) => next.run(ctx, request).await,
                Err(resource) => {
                    warn!(
                        correlation_id = %ctx.correlation_id(),
                        path = request.uri().path(),
                        %resource,
                        "admission window exhausted"
                    );
                    metrics::counter!(
                        "gatehouse_admission_denied_total",
                        "resource" => resource
                    )
                    .increment(1);
                    GatewayError::AdmissionExceeded.into_response()
                }
            }
        })
    }
}
