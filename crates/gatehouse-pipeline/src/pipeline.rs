//! The priority-ordered interceptor pipeline.
//!
//! Interceptors are registered in any order and sorted once, at build
//! time, by ascending [`Interceptor::order`]. The sort is stable:
//! interceptors with equal order run in registration order. The resolved
//! order is logged at startup so operators can verify the chain.

use crate::interceptor::{BoxFuture, Interceptor, Next};
use futures_util::FutureExt;
use gatehouse_core::{GatewayError, Request, RequestContext, Response};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info};

/// A type-erased interceptor.
pub type BoxedInterceptor = Arc<dyn Interceptor>;

/// The immutable, ordered interceptor chain.
pub struct Pipeline {
    interceptors: Vec<BoxedInterceptor>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs a request through the chain and into `handler`, the terminal
    /// that forwards to a backend.
    ///
    /// A panic anywhere in the chain or the terminal is caught and mapped
    /// to the internal-error envelope; the connection stays healthy.
    pub async fn process<H>(
        &self,
        ctx: &mut RequestContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let correlation_id = ctx.correlation_id();
        let next = self.build_chain(handler);

        match AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await {
            Ok(response) => response,
            Err(_) => {
                error!(%correlation_id, "interceptor panicked while handling request");
                metrics::counter!("gatehouse_pipeline_panics_total").increment(1);
                GatewayError::Internal { correlation_id }.into_response()
            }
        }
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::terminal(handler);
        for interceptor in self.interceptors.iter().rev() {
            next = Next::new(interceptor.as_ref(), next);
        }
        next
    }

    /// Returns stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Returns the number of registered stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.interceptors.len()
    }
}

/// Builder collecting interceptors before the one-time sort.
#[derive(Default)]
pub struct PipelineBuilder {
    interceptors: Vec<BoxedInterceptor>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interceptor. Registration order only matters as the
    /// tie-break between equal `order()` values.
    #[must_use]
    pub fn register<I: Interceptor>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Sorts the chain and builds the pipeline, logging the resolved
    /// order once.
    #[must_use]
    pub fn build(mut self) -> Pipeline {
        self.interceptors.sort_by_key(|i| i.order());

        let resolved: Vec<String> = self
            .interceptors
            .iter()
            .map(|i| format!("{}({})", i.name(), i.order()))
            .collect();
        info!(chain = %resolved.join(" -> "), "interceptor order resolved");

        Pipeline {
            interceptors: self.interceptors,
        }
    }
}
